//! GST return submission to the tax authority

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{error, info};

use crate::config::LedgerConfig;
use crate::ledger::audit::AuditTrail;
use crate::tax::gst::GstReturn;
use crate::traits::{AuditStore, TaxGateway};
use crate::types::*;
use crate::utils::clock::Clock;

pub const GST_RETURN_SUBMITTED_ACTION: &str = "gst_return_submitted";
pub const SIMULATED_PROCESSING_TIME: &str = "2-3 business days";

/// Outcome of a submission, simulated or live
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub submission_id: String,
    pub reference_number: String,
    pub confirmation_code: String,
    pub status: String,
    pub submitted_at: DateTime<Utc>,
    pub processing_time: Option<String>,
    pub simulated: bool,
    pub next_steps: Vec<String>,
}

/// `len` random upper-case hex characters
fn random_hex(len: usize) -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string().to_uppercase();
    hex[..len.min(hex.len())].to_string()
}

fn payment_due_step(gst_return: &GstReturn) -> String {
    format!(
        "Payment due date: {}",
        gst_return.payment_due_date.format("%d %B %Y")
    )
}

pub struct TaxSubmitter<A: AuditStore> {
    audit: AuditTrail<A>,
    config: Arc<LedgerConfig>,
    clock: Arc<dyn Clock>,
    gateway: Option<Arc<dyn TaxGateway>>,
}

impl<A: AuditStore> TaxSubmitter<A> {
    pub fn new(
        audit: AuditTrail<A>,
        config: Arc<LedgerConfig>,
        clock: Arc<dyn Clock>,
        gateway: Option<Arc<dyn TaxGateway>>,
    ) -> Self {
        Self {
            audit,
            config,
            clock,
            gateway,
        }
    }

    /// Submit a computed return.
    ///
    /// A dry run never leaves the process. A live submission needs the
    /// `live_tax_submission` capability and a gateway, and is audited
    /// against the organization.
    pub async fn submit(
        &self,
        gst_return: &GstReturn,
        dry_run: bool,
        user_id: Option<&str>,
        remote_address: IpAddr,
    ) -> LedgerResult<SubmissionResult> {
        if dry_run {
            return Ok(self.simulate(gst_return));
        }

        let gateway = match &self.gateway {
            Some(gateway) if self.config.capabilities.live_tax_submission => gateway,
            _ => {
                return Err(LedgerError::DependencyUnavailable(
                    "live tax submission is not available".to_string(),
                ))
            }
        };

        let ack = gateway.submit_gst_return(gst_return).await?;

        let changes = serde_json::json!({
            "period_start": gst_return.period.start(),
            "period_end": gst_return.period.end(),
            "net_gst_position_cents": gst_return.summary.net_gst_position_cents,
            "submission_id": ack.submission_id,
            "reference_number": ack.reference_number,
            "status": ack.status,
        });
        if let Err(e) = self
            .audit
            .record(
                AuditableRef::new(AuditableKind::Organization, &gst_return.organization_id),
                GST_RETURN_SUBMITTED_ACTION,
                changes,
                user_id,
                remote_address,
                self.clock.now(),
            )
            .await
        {
            error!(
                organization_id = %gst_return.organization_id,
                submission_id = %ack.submission_id,
                error = %e,
                "GST return submitted but audit write failed"
            );
            return Err(e);
        }

        info!(
            organization_id = %gst_return.organization_id,
            submission_id = %ack.submission_id,
            status = %ack.status,
            "GST return submitted"
        );

        Ok(SubmissionResult {
            submission_id: ack.submission_id,
            reference_number: ack.reference_number,
            confirmation_code: ack.confirmation_code,
            status: ack.status,
            submitted_at: ack.received_at,
            processing_time: None,
            simulated: false,
            next_steps: vec![payment_due_step(gst_return)],
        })
    }

    fn simulate(&self, gst_return: &GstReturn) -> SubmissionResult {
        let now = self.clock.now();
        SubmissionResult {
            submission_id: format!("SIM-{}", random_hex(16)),
            reference_number: format!("IRD-{}-{}", now.format("%Y%m%d"), random_hex(8)),
            confirmation_code: random_hex(12),
            status: "accepted".to_string(),
            submitted_at: now,
            processing_time: Some(SIMULATED_PROCESSING_TIME.to_string()),
            simulated: true,
            next_steps: vec![
                "Return will be processed by IRD".to_string(),
                "Confirmation will be sent to registered email".to_string(),
                payment_due_step(gst_return),
            ],
        }
    }
}
