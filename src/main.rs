//! turawallet 命令行入口
//! dotenv -> 配置 -> 日志 -> AppState -> 命令

use std::{process::ExitCode, sync::Arc};

use anyhow::{bail, Context, Result};
use turawallet::{
    app_state::AppState,
    config::Config,
    domain::{FeePolicy, TelegramUser, TransferRequest},
    infrastructure::logging,
    service::WalletSession,
    WalletError,
};

const USAGE: &str = "\
Usage: turawallet <command>

Commands:
  create                                   Generate a new 12-word wallet
  import <12 words>                        Import a wallet from its recovery phrase
  show                                     Show the wallet address
  balances                                 Fetch token balances
  score                                    Fetch balances and the credit score
  export                                   Print the recovery phrase
  reset                                    Remove the stored wallet
  transfer <SYMBOL> <recipient> <amount> [--fee auto|low|medium|high|manual:<gas_limit>:<gas_price>] [--memo <text>]
  user-score <telegram_id> [--premium]     Score a Telegram account by age and premium status";

#[derive(Debug, PartialEq)]
enum Command {
    Create,
    Import(String),
    Show,
    Balances,
    Score,
    Export,
    Reset,
    Transfer {
        symbol: String,
        recipient: String,
        amount: String,
        fee_policy: FeePolicy,
        memo: Option<String>,
    },
    UserScore {
        telegram_id: i64,
        premium: bool,
    },
}

fn parse_args(args: &[String]) -> Result<Command> {
    let Some((command, rest)) = args.split_first() else {
        bail!("missing command");
    };

    let command = match command.as_str() {
        "create" => Command::Create,
        "import" => {
            if rest.is_empty() {
                bail!("import requires the recovery phrase");
            }
            Command::Import(rest.join(" "))
        }
        "show" => Command::Show,
        "balances" => Command::Balances,
        "score" => Command::Score,
        "export" => Command::Export,
        "reset" => Command::Reset,
        "transfer" => {
            let mut positional = Vec::new();
            let mut fee_policy = FeePolicy::default();
            let mut memo = None;

            let mut iter = rest.iter();
            while let Some(arg) = iter.next() {
                match arg.as_str() {
                    "--fee" => {
                        let value = iter.next().context("--fee requires a value")?;
                        fee_policy = value.parse().map_err(|e| anyhow::anyhow!("{}", e))?;
                    }
                    "--memo" => {
                        memo = Some(iter.next().context("--memo requires a value")?.clone());
                    }
                    other => positional.push(other.to_string()),
                }
            }

            let [symbol, recipient, amount]: [String; 3] = positional
                .try_into()
                .map_err(|_| anyhow::anyhow!("transfer requires <SYMBOL> <recipient> <amount>"))?;

            Command::Transfer {
                symbol,
                recipient,
                amount,
                fee_policy,
                memo,
            }
        }
        "user-score" => {
            let telegram_id = rest
                .first()
                .context("user-score requires a telegram id")?
                .parse()
                .context("telegram id must be an integer")?;
            let premium = rest.iter().skip(1).any(|a| a == "--premium");
            Command::UserScore {
                telegram_id,
                premium,
            }
        }
        other => bail!("unknown command: {}", other),
    };

    Ok(command)
}

fn load_config() -> Result<Config> {
    let config_path = std::env::var("CONFIG_PATH").ok();
    let config = Config::from_env_and_file(config_path.as_deref())?;
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// 需要已加载钱包的命令先读取存储
async fn require_wallet(session: &WalletSession) -> Result<String> {
    match session.load_existing().await? {
        Some(address) => Ok(address),
        None => bail!("No wallet found. Run `turawallet create` or `turawallet import` first."),
    }
}

/// 会话内的错误已经通过 Notifier 提示过，这里只返回退出码
async fn run(command: Command, session: &WalletSession) -> Result<ExitCode> {
    match command {
        Command::Create => {
            let phrase = session.generate().await?;
            let snapshot = session.snapshot().await;
            println!("Address: {}", snapshot.address.unwrap_or_default());
            println!();
            println!("Recovery phrase (write it down, it will not be shown again):");
            println!("{}", phrase.expose());
        }
        Command::Import(words) => {
            let address = session.import(&words).await?;
            println!("Imported wallet: {}", address);
        }
        Command::Show => {
            let address = require_wallet(session).await?;
            let snapshot = session.snapshot().await;
            println!("{}", address);
            println!("({})", snapshot.masked_address.unwrap_or_default());
        }
        Command::Balances => {
            require_wallet(session).await?;
            for balance in session.refresh_balances().await? {
                println!("{:<6} {:>24}", balance.symbol, balance.display_amount());
            }
        }
        Command::Score => {
            require_wallet(session).await?;
            let snapshot = session.refresh().await?;
            for balance in &snapshot.balances {
                println!("{:<6} {:>24}", balance.symbol, balance.display_amount());
            }
            if let Some(score) = snapshot.credit_score {
                println!("Credit score: {}", score);
            }
        }
        Command::Export => {
            require_wallet(session).await?;
            println!("{}", session.export_phrase().await?.expose());
        }
        Command::Reset => {
            session.reset().await?;
        }
        Command::Transfer {
            symbol,
            recipient,
            amount,
            fee_policy,
            memo,
        } => {
            require_wallet(session).await?;
            let result = session
                .transfer(TransferRequest {
                    from_address: String::new(),
                    recipient,
                    amount,
                    symbol,
                    memo,
                    fee_policy,
                })
                .await?;
            if !result.success() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::UserScore {
            telegram_id,
            premium,
        } => {
            let user = TelegramUser {
                id: telegram_id,
                first_name: String::new(),
                last_name: None,
                username: None,
                language_code: None,
                is_premium: premium,
            };
            let score = user.score(chrono::Utc::now());
            println!("Account age: {:.1} years", score.account_age_years);
            println!("Score: {}", score.score);
        }
    }

    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match parse_args(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("error: {}\n\n{}", e, USAGE);
            return ExitCode::FAILURE;
        }
    };

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    // guard 需要活到进程退出
    let _log_guard = match logging::init_logging(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            None
        }
    };

    let state = match AppState::from_config(Arc::new(config)) {
        Ok(state) => state,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let session = WalletSession::new(&state);

    match run(command, &session).await {
        Ok(code) => code,
        Err(e) => {
            if let Some(line) = failure_line(&e) {
                eprintln!("{}", line);
            }
            tracing::debug!(error = %e, "Command failed");
            ExitCode::FAILURE
        }
    }
}

/// 钱包错误已经通过 Notifier 提示过，只补充可重试提示
fn failure_line(e: &anyhow::Error) -> Option<String> {
    match e.downcast_ref::<WalletError>() {
        Some(err) if err.is_retryable() => {
            Some("This looks temporary. Run the command again to retry.".to_string())
        }
        Some(_) => None,
        None => Some(format!("error: {}", e)),
    }
}
