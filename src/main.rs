use std::path::Path;

use anyhow::{Context, Result};
use tiku_request::utils::logging;
use tiku_request::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志并加载配置
    let config = load_config()?;

    // 初始化并运行应用
    let mut app = App::initialize(config).await?;
    app.run().await?;

    Ok(())
}

/// `TIKU_CONFIG` 指向 TOML 文件时从文件加载，否则读环境变量
///
/// 日志在读取环境变量之前初始化，解析失败的告警才能输出。
fn load_config() -> Result<Config> {
    match std::env::var("TIKU_CONFIG") {
        Ok(path) => {
            let config = Config::from_toml_file(Path::new(&path))
                .with_context(|| format!("无法加载配置文件: {}", path))?;
            logging::init(config.verbose_logging);
            Ok(config)
        }
        Err(_) => {
            logging::init(Config::verbose_from_env());
            Ok(Config::from_env())
        }
    }
}
