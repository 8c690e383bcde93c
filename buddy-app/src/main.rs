use std::path::PathBuf;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    buddy_app::init_logging();

    // 可选参数：配置文件路径
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    buddy_app::run(config_path).await
}
