use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::sync::broadcast::error::RecvError;
use voucher_upload::utils::logging;
use voucher_upload::{control_run, App, Config, EventHub, RunEvent};

#[derive(Debug, Parser)]
#[command(author, version, about = "Batch voucher upload")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 上传一个 CSV 文件
    Run { csv: PathBuf },
    /// 暂停 / 恢复 / 停止一次运行
    Control {
        run_folder: PathBuf,
        /// pause | resume | stop
        action: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logging::init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run { csv } => {
            // 加载配置
            let config = Config::from_env();
            let hub = EventHub::new();

            // 初始化并运行应用
            let app = App::initialize(config, hub.clone());
            let workspace = app.prepare(&csv).await?;

            // 先订阅，再开始运行
            let mut events = hub.subscribe(&workspace.run_id);
            let console = tokio::spawn(async move {
                loop {
                    match events.recv().await {
                        Ok(RunEvent::Line(line)) => print!("{}", line),
                        Ok(RunEvent::Finished { .. }) | Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(_)) => continue,
                    }
                }
            });

            let outcome = app.execute(&workspace).await?;
            let _ = console.await;

            if outcome.exit_code != 0 {
                std::process::exit(outcome.exit_code);
            }
        }
        Command::Control { run_folder, action } => {
            let state = control_run(&run_folder, &action)?;
            println!("{}", state);
        }
    }

    Ok(())
}
