use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

/// Counters describing what the profile gate did.
#[derive(Clone)]
pub struct GateMetrics {
    registry: Registry,
    evaluations: IntCounterVec,
    profile_updates: IntCounterVec,
    forced_logouts: IntCounterVec,
}

impl GateMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let evaluations = IntCounterVec::new(
            Opts::new(
                "profile_gate_evaluations_total",
                "Profile gate evaluation passes by outcome",
            ),
            &["outcome"],
        )?;
        let profile_updates = IntCounterVec::new(
            Opts::new(
                "profile_gate_updates_total",
                "Profile update submissions by result",
            ),
            &["result"],
        )?;
        let forced_logouts = IntCounterVec::new(
            Opts::new(
                "profile_gate_forced_logouts_total",
                "Forced logouts after a profile update by logout call result",
            ),
            &["logout"],
        )?;

        registry.register(Box::new(evaluations.clone()))?;
        registry.register(Box::new(profile_updates.clone()))?;
        registry.register(Box::new(forced_logouts.clone()))?;

        Ok(Self {
            registry,
            evaluations,
            profile_updates,
            forced_logouts,
        })
    }

    pub fn record_evaluation(&self, outcome: &str) {
        self.evaluations.with_label_values(&[outcome]).inc();
    }

    pub fn record_update(&self, result: &str) {
        self.profile_updates.with_label_values(&[result]).inc();
    }

    pub fn record_forced_logout(&self, logout: &str) {
        self.forced_logouts.with_label_values(&[logout]).inc();
    }

    pub fn evaluations(&self, outcome: &str) -> u64 {
        self.evaluations.with_label_values(&[outcome]).get()
    }

    pub fn updates(&self, result: &str) -> u64 {
        self.profile_updates.with_label_values(&[result]).get()
    }

    pub fn forced_logouts(&self, logout: &str) -> u64 {
        self.forced_logouts.with_label_values(&[logout]).get()
    }

    /// Prometheus text exposition of all gate counters.
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::error!("Failed to encode gate metrics: {}", e);
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_render_as_text() {
        let metrics = GateMetrics::new().unwrap();
        metrics.record_evaluation("blocking");
        metrics.record_evaluation("blocking");
        metrics.record_update("success");

        assert_eq!(metrics.evaluations("blocking"), 2);
        let text = metrics.render();
        assert!(text.contains("profile_gate_evaluations_total{outcome=\"blocking\"} 2"));
        assert!(text.contains("profile_gate_updates_total{result=\"success\"} 1"));
    }
}
