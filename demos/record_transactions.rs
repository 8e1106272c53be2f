//! Recording transactions through the compliance pipeline

use chrono::{TimeZone, Utc};
use ledger_compliance_core::{
    Account, AccountType, Currency, FixedClock, Ledger, MemoryReportingQueue, MemoryStorage,
    Money, Organization, TransactionCandidate, TransactionType, User, UserRole,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("🧾 Ledger Compliance Core - Recording Transactions\n");

    // Organization, account and users normally come from onboarding
    let storage = MemoryStorage::new();
    storage.save_organization(Organization::new(
        "org-1".to_string(),
        "Harbourside Imports Ltd".to_string(),
        "123456789".to_string(),
    ))?;
    storage.save_account(Account::new(
        "acc-1".to_string(),
        "org-1".to_string(),
        "Operating".to_string(),
        "12-3456-7890123-00".to_string(),
        AccountType::BusinessChecking,
        Currency::nzd(),
    ))?;
    storage.save_user(User::new(
        "clerk".to_string(),
        "org-1".to_string(),
        "clerk@harbourside.co.nz".to_string(),
        "Mere".to_string(),
        "Parata".to_string(),
        UserRole::User,
    ))?;
    storage.save_user(User::new(
        "officer".to_string(),
        "org-1".to_string(),
        "compliance@harbourside.co.nz".to_string(),
        "Tom".to_string(),
        "Walsh".to_string(),
        UserRole::ComplianceOfficer,
    ))?;

    // Tuesday 12 March 2024, 10:00 in Auckland
    let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 3, 11, 21, 0, 0).unwrap());
    let queue = MemoryReportingQueue::new();
    let ledger = Ledger::builder(storage.clone())
        .clock(Arc::new(clock))
        .reporting_queue(Arc::new(queue.clone()))
        .build()?;

    let candidates = vec![
        ("clerk", 45_000, Currency::nzd()),
        ("clerk", 1_500_000, Currency::nzd()),
        ("officer", 1_500_000, Currency::nzd()),
        ("clerk", 20_000, Currency::new("AUD")),
    ];

    for (user, amount_cents, currency) in candidates {
        let candidate = TransactionCandidate::new(
            "acc-1".to_string(),
            Money::new(amount_cents, currency),
            TransactionType::PaymentIn,
            user.to_string(),
            "Customer invoice".to_string(),
        );
        let amount = candidate.amount().format_amount();

        match ledger.record_transaction(candidate).await {
            Ok(recorded) => {
                let txn = recorded.transaction;
                println!(
                    "  ✓ {} {} by {}: {:?}, flags {:?}, risk {}",
                    txn.reference,
                    amount,
                    user,
                    txn.compliance_status,
                    txn.compliance_flags,
                    txn.risk_score()
                );
                println!(
                    "    audit entry {} expires {}",
                    recorded.audit_entry.id,
                    recorded.audit_entry.expires_at.format("%Y-%m-%d")
                );
            }
            Err(e) => {
                println!("  ✗ {} by {} rejected:", amount, user);
                if let Some(errors) = e.validation_errors() {
                    for error in errors.errors() {
                        println!("    - {} {}", error.field, error.message);
                    }
                }
            }
        }
    }

    println!("\n📊 Monthly summary");
    let summary = ledger.monthly_summary("acc-1").await?;
    println!("  Transactions: {}", summary.total_transactions);
    println!("  Inflow: ${}", summary.total_inflow);
    println!("  Largest: ${}", summary.largest_transaction);
    println!(
        "  Compliance score: {}",
        ledger.organization_compliance_score("org-1").await?
    );
    println!("  Queued regulatory reports: {}", queue.reports()?.len());

    Ok(())
}
