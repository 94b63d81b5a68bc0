use sqlx::{Executor, Result, Sqlite, SqlitePool};

use super::{NewProduct, ProductImageRecord, ProductRecord};

/// 有图片但还没有指纹的条件
const UNINDEXED: &str = "fingerprint IS NULL AND image_ref IS NOT NULL AND image_ref != ''";

/// 添加商品
pub async fn add_product<'c, E>(executor: E, product: &NewProduct) -> Result<i64>
where
    E: Executor<'c, Database = Sqlite>,
{
    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO product (title, price, category, image_ref)
        VALUES (?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(&product.title)
    .bind(product.price)
    .bind(&product.category)
    .bind(&product.image_ref)
    .fetch_one(executor)
    .await?;

    Ok(id)
}

/// 修改商品主图，同时清空旧指纹
///
/// 两者必须在同一条语句中完成，否则读者可能看到新图片配旧指纹
pub async fn update_image_ref(
    executor: &SqlitePool,
    id: i64,
    image_ref: Option<&str>,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE product SET image_ref = ?, fingerprint = NULL
        WHERE id = ? AND image_ref IS NOT ?
        "#,
    )
    .bind(image_ref)
    .bind(id)
    .bind(image_ref)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// 获取单个商品
pub async fn get_product(executor: &SqlitePool, id: i64) -> Result<Option<ProductRecord>> {
    sqlx::query_as(
        r#"
        SELECT id, title, price, category, image_ref, fingerprint FROM product WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// 获取未索引的商品，`limit` 为空时返回全部
pub async fn get_unindexed(
    executor: &SqlitePool,
    limit: Option<usize>,
) -> Result<Vec<ProductImageRecord>> {
    // SQLite 中 LIMIT -1 表示不限制
    let limit = limit.map(|n| i64::try_from(n).unwrap_or(i64::MAX)).unwrap_or(-1);
    let sql = format!("SELECT id, image_ref FROM product WHERE {UNINDEXED} ORDER BY id LIMIT ?");
    sqlx::query_as(&sql).bind(limit).fetch_all(executor).await
}

/// 统计未索引的商品数量
pub async fn count_unindexed(executor: &SqlitePool) -> Result<u64> {
    let sql = format!("SELECT COUNT(*) FROM product WHERE {UNINDEXED}");
    let (count,): (i64,) = sqlx::query_as(&sql).fetch_one(executor).await?;
    Ok(count as u64)
}

/// 写入指纹
///
/// 只有当商品主图仍然是 `image_ref` 时才写入，返回是否写入成功。
/// 计算期间主图被修改时，旧图片的指纹会被丢弃，新图片留给下一次回填。
/// 并发写入同一图片时以最后一次为准，同样的图片必然得到同样的指纹
pub async fn set_fingerprint(
    executor: &SqlitePool,
    id: i64,
    image_ref: &str,
    fingerprint: &str,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE product SET fingerprint = ? WHERE id = ? AND image_ref = ?
        "#,
    )
    .bind(fingerprint)
    .bind(id)
    .bind(image_ref)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// 获取所有已有指纹的商品
pub async fn get_indexed(executor: &SqlitePool) -> Result<Vec<ProductRecord>> {
    sqlx::query_as(
        r#"
        SELECT id, title, price, category, image_ref, fingerprint FROM product
        WHERE fingerprint IS NOT NULL
        ORDER BY id
        "#,
    )
    .fetch_all(executor)
    .await
}

/// 商品总数
pub async fn count_products(executor: &SqlitePool) -> Result<u64> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM product").fetch_one(executor).await?;
    Ok(count as u64)
}
