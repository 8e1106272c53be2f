//! Computing, assessing and (dry-run) submitting a GST return

use chrono::{TimeZone, Utc};
use ledger_compliance_core::{
    Account, AccountType, Currency, FixedClock, GstTreatment, Ledger, MemoryStorage, Money,
    Organization, PayeOutcome, TaxPeriod, TransactionCandidate, TransactionType, User, UserRole,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("🧾 Ledger Compliance Core - GST Return\n");

    let storage = MemoryStorage::new();
    let mut organization = Organization::new(
        "org-1".to_string(),
        "Aotearoa Outfitters Ltd".to_string(),
        "98765432".to_string(),
    );
    organization.gst_registered = true;
    organization.annual_turnover_cents = 120_000_000;
    storage.save_organization(organization)?;
    storage.save_account(Account::new(
        "acc-1".to_string(),
        "org-1".to_string(),
        "Trading".to_string(),
        "01-0123-0456789-00".to_string(),
        AccountType::BusinessChecking,
        Currency::nzd(),
    ))?;
    storage.save_user(User::new(
        "owner".to_string(),
        "org-1".to_string(),
        "owner@outfitters.co.nz".to_string(),
        "Ana".to_string(),
        "Kaur".to_string(),
        UserRole::Admin,
    ))?;

    // Wednesday 13 March 2024, 11:00 in Auckland
    let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 3, 12, 22, 0, 0).unwrap());
    let ledger = Ledger::builder(storage)
        .clock(Arc::new(clock))
        .build()?;

    let entries = [
        (TransactionType::PaymentIn, 460_000, GstTreatment::Standard, "Retail sales"),
        (TransactionType::PaymentIn, 180_000, GstTreatment::ZeroRated, "Export sales"),
        (TransactionType::Deposit, 92_000, GstTreatment::Standard, "Retail sales"),
        (TransactionType::PaymentOut, 230_000, GstTreatment::Standard, "Stock"),
        (TransactionType::Withdrawal, 34_500, GstTreatment::Standard, "Rent"),
    ];
    for (transaction_type, amount_cents, treatment, category) in entries {
        ledger
            .record_transaction(
                TransactionCandidate::new(
                    "acc-1".to_string(),
                    Money::nzd(amount_cents),
                    transaction_type,
                    "owner".to_string(),
                    format!("{} ({})", category, transaction_type),
                )
                .category(category.to_string())
                .gst_treatment(treatment),
            )
            .await?;
    }

    let period = TaxPeriod::month(2024, 3)?;
    let gst_return = ledger.compute_gst_return("org-1", period).await?;
    let summary = &gst_return.summary;

    println!("📄 {} - {}", gst_return.organization_name, gst_return.period_description);
    println!("  Sales (incl. GST):     {} cents", summary.sales.inclusive_cents);
    println!("  GST collected:         {} cents", summary.total_gst_collected_cents);
    println!("  Purchases (incl. GST): {} cents", summary.purchases.inclusive_cents);
    println!("  GST paid:              {} cents", summary.total_gst_paid_cents);
    println!("  Zero-rated sales:      {} cents", summary.zero_rated_sales_cents);
    println!("  Net GST position:      ${}", summary.net_gst_position());
    println!("  Due date:              {}", gst_return.due_date);
    println!("  Confidence:            {}", gst_return.assessment.confidence_score);

    println!("\n📂 Category breakdown");
    for (category, total) in &gst_return.sales_breakdown {
        println!("  sales     {:<14} ${}", category, total);
    }
    for (category, total) in &gst_return.purchase_breakdown {
        println!("  purchases {:<14} ${}", category, total);
    }

    match ledger.calculate_paye("org-1", period).await? {
        PayeOutcome::NotApplicable { reason } => println!("\n👥 PAYE: not applicable ({})", reason),
        PayeOutcome::Calculated(paye) => {
            println!("\n👥 PAYE due {}: {} cents", paye.due_date, paye.net_payment_cents)
        }
    }

    let assessment = ledger.assess_tax_compliance("org-1").await?;
    println!(
        "\n✅ Tax compliance score {} ({} issues)",
        assessment.compliance_score, assessment.issues_count
    );

    let submission = ledger
        .submit_gst_return(&gst_return, true, Some("owner"))
        .await?;
    println!("\n📨 Simulated submission {}", submission.submission_id);
    for step in &submission.next_steps {
        println!("  - {}", step);
    }

    Ok(())
}
