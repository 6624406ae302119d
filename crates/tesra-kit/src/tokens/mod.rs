//! Tep1 fungible token contracts.
//!
//! Tep1 is the TeoVM token standard. Amounts are arbitrary-precision
//! integers in the token's smallest unit.
//!
//! ```rust,no_run
//! use tesra_kit::*;
//!
//! # async fn example(contract: Address, bob: Address) -> Result<(), tesra_kit::Error> {
//! let tesra = Tesra::testnet().credentials("p256:<hex secret key>")?.build();
//! let token = tesra.tep1(contract);
//!
//! // Metadata (decimals cached after first call)
//! println!("{} ({} decimals)", token.name().await?, token.decimals().await?);
//!
//! // Balance of any account
//! let balance = token.balance_of(&bob).await?;
//! println!("bob holds {balance}");
//!
//! // Transfer from the configured signer
//! let hash = token.transfer(&bob, 1_500_000).await?;
//!
//! // Transfer events recorded by that transaction
//! for event in token.fetch_tx_transfer_events(&hash).await? {
//!     println!("{event}");
//! }
//! # Ok(())
//! # }
//! ```

mod tep1;
mod types;

pub use tep1::Tep1;
pub use types::{Tep1TransferEvent, TransferState};
