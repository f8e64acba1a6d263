// crates/keel-cli/src/main.rs
//
// CLI entrypoint for the Keel Protocol operator tools.
//
// Initializes tracing, loads configuration, and drives an in-memory engine
// through a scripted end-to-end scenario: seed, mint/draw/reset, harvest
// and distribution, the staking exit flow with acceleration, and a
// floor-defended swap. Useful as a smoke harness and a worked example of
// the engine API.

mod config;
mod output;

use clap::{Parser, Subcommand};

use keel_core::{AccountId, AuthContext, TokenId, Wad, WAD};
use keel_engine::{reserve_token, supply_token, EngineConfig, KeelEngine};

use config::CliConfig;
use output::{fmt_wad, format_json, format_table, BalanceRow, EpochRow, PoolRow};

/// Keel Protocol CLI — treasury, exit queue, and floor AMM tooling.
#[derive(Parser, Debug)]
#[command(
    name = "keel",
    version = "0.1.0",
    about = "Keel Protocol CLI — value-accounting engine tooling"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, default_value = "keel.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the scripted end-to-end scenario against a fresh engine.
    Scenario,

    /// Print the resolved configuration as JSON.
    Config,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = CliConfig::load(&cli.config)?;

    // Initialize tracing subscriber for structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_level.clone())),
        )
        .init();

    match &cli.command {
        Commands::Scenario => run_scenario(&config),
        Commands::Config => {
            println!("{}", format_json(&config));
            Ok(())
        }
    }
}

fn wad(whole: u64) -> Wad {
    Wad::from(whole) * WAD
}

fn run_scenario(config: &CliConfig) -> Result<(), Box<dyn std::error::Error>> {
    let admin = AccountId::from_label("admin");
    let ctx = AuthContext::new(admin);

    let mut engine = KeelEngine::new(EngineConfig {
        admin,
        first_block: 0,
        epoch_size: config.epoch_size,
        max_per_epoch: wad(config.max_per_epoch),
        max_per_address: wad(config.max_per_address),
    })?;

    // The ledger stands in for the surrounding chain: endow the
    // administrator with reserve to seed from.
    engine
        .ledger_mut()
        .mint(reserve_token(), admin, wad(config.seed_reserve) * 10)?;

    // --- 1. Seed ---------------------------------------------------------
    engine.seed(&ctx, wad(config.seed_reserve), wad(config.seed_supply))?;
    let iv = engine.intrinsic_value_ratio()?;
    println!("seeded: IV = {}/{}", fmt_wad(iv.reserve), fmt_wad(iv.supply));

    // --- 2. Mint, draw, reset --------------------------------------------
    let grantee = AccountId::from_label("grantee");
    let grant = wad(config.seed_supply / 2);
    engine.mint_and_allocate(&ctx, grantee, grant)?;
    println!("granted {} supply to {} (IV unchanged)", fmt_wad(grant), grantee);

    engine.draw_allowance(&AuthContext::new(grantee), grant)?;
    if engine.harvest(&ctx, 50).is_err() {
        tracing::info!("dilution detected; resetting the recorded ratio");
        let rebased = engine.reset_iv(&ctx)?;
        println!(
            "reset: IV = {}/{}",
            fmt_wad(rebased.reserve),
            fmt_wad(rebased.supply)
        );
    }

    // --- 3. Harvest and distribute ---------------------------------------
    let pool_a = AccountId::from_label("pool-a");
    let pool_b = AccountId::from_label("pool-b");
    engine.upsert_pool(&ctx, pool_a, 2)?;
    engine.upsert_pool(&ctx, pool_b, 1)?;

    // Simulate strategy yield arriving in the treasury account.
    let treasury_account = engine.treasury().account();
    engine
        .ledger_mut()
        .mint(reserve_token(), treasury_account, wad(config.seed_reserve / 2))?;
    let minted = engine.harvest(&ctx, 50)?;
    let paid = engine.distribute_harvest()?;
    println!(
        "harvest minted {} rewards, distributed {}",
        fmt_wad(minted),
        fmt_wad(paid)
    );

    let pool_rows: Vec<PoolRow> = [(pool_a, "pool-a"), (pool_b, "pool-b")]
        .iter()
        .map(|(account, name)| PoolRow {
            pool: name.to_string(),
            share: engine.pool_harvest_share(*account).unwrap_or(0),
            received: fmt_wad(engine.balance(supply_token(), *account)),
        })
        .collect();
    println!("{}", format_table(&pool_rows));

    // --- 4. Stake, exit, accelerate --------------------------------------
    let holder = AccountId::from_label("holder");
    let holder_ctx = AuthContext::new(holder);
    let position = wad(config.max_per_epoch * 3);
    engine.ledger_mut().mint(supply_token(), holder, position)?;
    engine.stake(&holder_ctx, position)?;
    engine.unstake(&holder_ctx, position)?;

    let entry = engine
        .exit_entry(holder)
        .ok_or("holder should hold an exit entry")?;
    println!(
        "exit window: epochs {}..={}",
        entry.first_exit_epoch, entry.last_exit_epoch
    );

    engine.set_block(config.epoch_size * 2)?;
    engine.set_acceleration_policy(&ctx, 1, 1, 0)?;
    println!("accelerated epoch: {}", engine.current_epoch());

    let claimable = engine.claimable_epochs(holder);
    let epoch_rows: Vec<EpochRow> = claimable
        .iter()
        .map(|(epoch, amount)| EpochRow {
            epoch: *epoch,
            amount: fmt_wad(*amount),
        })
        .collect();
    println!("{}", format_table(&epoch_rows));

    let epochs: Vec<u64> = claimable.iter().map(|(epoch, _)| *epoch).collect();
    let out = engine.withdraw_epochs(&holder_ctx, &epochs)?;
    println!("withdrew {} across {} epochs", fmt_wad(out), epochs.len());

    // --- 5. Floor-defended swap ------------------------------------------
    let stable = TokenId::from_label("swap-stable");
    engine.add_pair(&ctx, stable, AccountId::from_label("pair-stable"))?;
    engine
        .ledger_mut()
        .mint(stable, admin, wad(config.seed_supply / 5))?;
    engine.add_liquidity(
        &ctx,
        stable,
        wad(config.seed_supply / 2),
        wad(config.seed_supply / 10),
        0,
        0,
        engine.block() + 1,
    )?;
    engine.set_defend_stable(&ctx, stable)?;
    let defend_account = engine.amm().defend_account();
    engine
        .ledger_mut()
        .mint(stable, defend_account, wad(config.seed_reserve * 10))?;

    let seller = AccountId::from_label("seller");
    engine
        .ledger_mut()
        .mint(supply_token(), seller, wad(config.seed_supply * 5))?;
    let outcome = engine.swap_exact_supply_for_stable(
        &AuthContext::new(seller),
        stable,
        wad(config.seed_supply * 5),
        0,
        seller,
        engine.block() + 1,
    )?;
    println!(
        "sell filled at {}{}",
        fmt_wad(outcome.amount_out),
        if outcome.floor_defended {
            " (floor defended)"
        } else {
            ""
        }
    );

    // --- 6. Final balances ------------------------------------------------
    let rows: Vec<BalanceRow> = [
        ("holder", holder, supply_token(), "KEEL"),
        ("seller", seller, stable, "swap-stable"),
        ("pool-a", pool_a, supply_token(), "KEEL"),
        ("pool-b", pool_b, supply_token(), "KEEL"),
    ]
    .iter()
    .map(|(name, account, token, token_name)| BalanceRow {
        account: name.to_string(),
        token: token_name.to_string(),
        balance: fmt_wad(engine.balance(*token, *account)),
    })
    .collect();
    println!("{}", format_table(&rows));

    Ok(())
}
