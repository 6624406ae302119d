//! Quickstart - Essential Tesra operations
//!
//! Covers: chain queries, native token reads, transfers, Tep1 tokens and
//! offline payload decoding
//!
//! Run: cargo run --example quickstart
//!
//! Set environment variables for write operations:
//!   TESRA_NETWORK=testnet
//!   TESRA_PRIVATE_KEY=p256:...

use std::time::Duration;

use tesra_kit::*;

// ============================================================================
// 1. Read chain data (no credentials needed)
// ============================================================================

async fn read_example() -> Result<(), Error> {
    println!("=== Read Example ===\n");

    let tesra = Tesra::testnet().build();

    println!("Node version: {}", tesra.get_version().await?);
    println!("Block height: {}", tesra.get_current_block_height().await?);

    let address: Address = "AFmseVrdL9f9oyCzZefL9tG6UbvhPbdYzM".parse()?;
    // Independent reads can run concurrently
    let (tsr_token, tsg_token) = (tesra.tsr(), tesra.tsg());
    let (tsr, tsg, unbound) = futures::try_join!(
        tsr_token.balance_of(&address),
        tsg_token.balance_of(&address),
        tsg_token.unbound_tsg(&address),
    )?;
    println!("{address}: {tsr} TSR, {tsg} TSG, {unbound} TSG claimable");

    let params = tesra.global_params().get_global_params(&["gasPrice"]).await?;
    println!("Global params: {params:?}");

    Ok(())
}

// ============================================================================
// 2. Transfer native tokens (requires credentials)
// ============================================================================

async fn transfer_example(tesra: &Tesra) -> Result<(), Error> {
    println!("\n=== Transfer Example ===\n");

    let to: Address = "AFmseVrdL9f9oyCzZefL9tG6UbvhPbdYzM".parse()?;

    // Submit and wait for the execution record
    let event = tesra
        .tsr()
        .transfer(&to, 1)
        .send_and_wait(Duration::from_secs(60))
        .await?;
    println!("Transfer {} consumed {} gas", event.tx_hash, event.gas_consumed);

    // Claim unbound TSG with a higher gas price
    let hash = tesra.tsg().withdraw_tsg(1).gas_price(2500).await?;
    println!("Withdraw submitted: {hash}");

    Ok(())
}

// ============================================================================
// 3. Tep1 tokens (requires credentials)
// ============================================================================

async fn tep1_example(tesra: &Tesra, contract: Address) -> Result<(), Error> {
    println!("\n=== Tep1 Example ===\n");

    let token = tesra.tep1(contract);
    println!(
        "{} ({}), {} decimals",
        token.name().await?,
        token.symbol().await?,
        token.decimals().await?
    );

    let me = tesra.signer_address()?;
    println!("Balance: {}", token.balance_of(&me).await?);

    let hash = token.transfer(&me, 0).await?;
    tesra.wait_for_transaction(&hash, Duration::from_secs(60)).await?;
    for event in token.fetch_tx_transfer_events(&hash).await? {
        println!("  {event}");
    }

    Ok(())
}

// ============================================================================
// 4. Offline build, sign and decode
// ============================================================================

async fn offline_example() -> Result<(), Error> {
    println!("\n=== Offline Example ===\n");

    let tesra = Tesra::testnet().build();
    let sender = Account::random(KeyType::P256)?;
    let receiver = Account::random(KeyType::Ed25519)?;

    let mut tx = tesra.tsr().new_transfer_transaction(
        GasSettings::default(),
        sender.address(),
        receiver.address(),
        42,
    )?;
    tesra.sign_to_transaction(&mut tx, &sender).await?;
    let wire = tx.to_hex()?;
    println!("Signed transaction: {wire}");

    let decoded = parse_native_tx_payload(&tx.to_bytes()?)?;
    println!("{} on {}: {:?}", decoded.function_name, decoded.contract, decoded.param);

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    read_example().await?;
    offline_example().await?;

    match Tesra::from_env() {
        Ok(tesra) if tesra.signer().is_some() => {
            transfer_example(&tesra).await?;
            if let Ok(contract) = std::env::var("TEP1_CONTRACT") {
                tep1_example(&tesra, Address::from_hex_string(&contract)?).await?;
            }
        }
        _ => println!("\nSet TESRA_PRIVATE_KEY to run the write examples."),
    }

    Ok(())
}
