//! Campaign statistics derived from a loaded recipient list

use docmailer_types::Recipient;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CampaignStats {
    pub total: usize,
    pub active: usize,
    pub canceled: usize,
    pub sent: usize,
    pub sent_percentage: f64,
    pub responded: usize,
    pub responded_percentage: f64,
    /// Responded / sent, active recipients only
    pub response_rate: f64,
    pub awaiting_response: usize,
}

impl CampaignStats {
    pub fn from_recipients(recipients: &[Recipient]) -> Self {
        let total = recipients.len();
        let active: Vec<&Recipient> = recipients.iter().filter(|r| r.is_active()).collect();

        let sent = active.iter().filter(|r| r.has_been_sent()).count();
        let responded = active.iter().filter(|r| r.has_responded()).count();
        let responded_among_sent = active
            .iter()
            .filter(|r| r.has_been_sent() && r.has_responded())
            .count();

        Self {
            total,
            active: active.len(),
            canceled: total - active.len(),
            sent,
            sent_percentage: percentage(sent, active.len()),
            responded,
            responded_percentage: percentage(responded, active.len()),
            response_rate: percentage(responded_among_sent, sent),
            awaiting_response: sent - responded_among_sent,
        }
    }
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 * 100.0 / whole as f64
}

impl fmt::Display for CampaignStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total recipients:      {}", self.total)?;
        writeln!(f, "Active:                {}", self.active)?;
        writeln!(f, "Canceled:              {}", self.canceled)?;
        writeln!(f, "Sent:                  {} ({:.1}%)", self.sent, self.sent_percentage)?;
        writeln!(
            f,
            "Responded:             {} ({:.1}%)",
            self.responded, self.responded_percentage
        )?;
        writeln!(f, "Response rate (sent):  {:.1}%", self.response_rate)?;
        write!(f, "Awaiting response:     {}", self.awaiting_response)
    }
}
