use clap::Parser;
use serde_json::json;

use jusic_core::config::{set_global_config, Config};
use jusic_core::errors::JusicResult;
use jusic_core::predictor::Predictor;

mod chatbot;

use chatbot::Chatbot;

/// 웹 백엔드에서 프로세스로 호출되는 챗봇 CLI
/// stdout에는 JSON 한 줄만 출력 (로그는 stderr) - 오류도 항상 JSON으로 감싼다
#[derive(Parser)]
#[command(name = "jusicbot")]
#[command(about = "Rule-based Korean stock chatbot over the 12-model bundle")]
struct Args {
    /// 사용자 메시지 (한국어 자연어)
    message: String,

    /// 설정 파일 경로 (기본값: config.toml)
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

fn run(args: &Args) -> JusicResult<String> {
    let config = Config::load_from_file(&args.config)?;
    set_global_config(config.clone())?;

    let predictor = Predictor::from_config(&config)?;
    let chatbot = Chatbot::new(predictor);

    let reply = chatbot.chat(&args.message);
    let json = serde_json::to_string(&reply)?;
    Ok(json)
}

fn main() {
    let args = Args::parse();

    // stdout은 JSON 전용이므로 로그는 stderr로만
    if let Err(e) = jusic_core::init_tracing_stderr() {
        eprintln!("{}", e);
    }

    match run(&args) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            // 스택 트레이스 대신 항상 JSON 오류 페이로드
            println!(
                "{}",
                json!({
                    "success": false,
                    "error": e.to_string(),
                })
            );
            std::process::exit(1);
        }
    }
}
