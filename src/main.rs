use anyhow::{Context, Result};
use submission_grader::utils::logging;
use submission_grader::{BatchGrader, Config};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // 加载配置
    let config = Config::from_env().context("配置加载失败")?;

    // 初始化日志
    logging::init(config.verbose_logging);

    BatchGrader::new(config).run().await?;

    Ok(())
}
