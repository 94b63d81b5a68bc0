use clap::Parser;
use lookalike::Opts;
use lookalike::cli::SubCommandExtend;
use lookalike::config::SubCommand;

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let opts = Opts::parse();

    match &opts.subcmd {
        SubCommand::Import(config) => config.run(&opts).await,
        SubCommand::Hash(config) => config.run(&opts).await,
        SubCommand::Search(config) => config.run(&opts).await,
        SubCommand::Reindex(config) => config.run(&opts).await,
        SubCommand::Server(config) => config.run(&opts).await,
    }
}
