pub mod account_resolver;
pub mod balance_fetcher;
pub mod credential_store;
pub mod score_fetcher;
pub mod transaction_builder;
pub mod transfer_orchestrator;
pub mod wallet_session;

pub use account_resolver::AccountResolver;
pub use balance_fetcher::BalanceFetcher;
pub use credential_store::CredentialStore;
pub use score_fetcher::{CreditScore, HttpScoreApi, ScoreApi, ScoreFetcher};
pub use transfer_orchestrator::TransferOrchestrator;
pub use wallet_session::{SessionSnapshot, WalletSession};
