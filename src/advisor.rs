//! Sleep advisor
//!
//! Runs the weekly analysis and produces advice and tonight's plan, asking
//! the configured [`AdviceProvider`] for the narrative when one is available.
//! Any provider failure falls back to the rule-based output in
//! [`crate::advice`]; callers always receive fully populated results.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::advice::{
    self, AdvicePayload, AdviceSource, AnalysisResult, SchedulePlan,
};
use crate::config::AdvisorConfig;
use crate::metrics::TARGET_NIGHTLY_HOURS;
use crate::models::SleepRecord;
use crate::provider::{request_text, AdviceProvider, GeminiProvider, ProviderReply};

/// Bedtime text attached to provider-written plans
pub const PROVIDER_BEDTIME_TEXT: &str = "Suggested by the advice service";

/// Everything produced by one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisorReport {
    pub analysis: AnalysisResult,
    pub advice: AdvicePayload,
    pub plan: SchedulePlan,
}

/// Advice generator with an optional external provider
#[derive(Clone)]
pub struct SleepAdvisor {
    provider: Option<Arc<dyn AdviceProvider>>,
    timeout: Duration,
}

impl std::fmt::Debug for SleepAdvisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SleepAdvisor")
            .field("provider", &self.provider.as_ref().map(|p| p.name().to_string()))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl SleepAdvisor {
    pub fn new(provider: Option<Arc<dyn AdviceProvider>>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    /// Advisor that only uses the built-in rules
    pub fn offline() -> Self {
        Self::new(None, crate::provider::DEFAULT_TIMEOUT)
    }

    /// Build an advisor from configuration.
    ///
    /// A disabled or unconfigured provider is not an error; the advisor
    /// simply runs offline.
    pub fn from_config(config: &AdvisorConfig) -> Self {
        let timeout = config.timeout();

        if !config.enabled {
            info!("Advice provider disabled, using built-in advice");
            return Self::new(None, timeout);
        }

        match GeminiProvider::from_env(&config.api_key_env, timeout) {
            Ok(provider) => {
                let provider = provider
                    .with_model(config.model.clone())
                    .with_base_url(config.base_url.clone());
                info!(model = provider.model(), "Advice provider configured");
                Self::new(Some(Arc::new(provider)), timeout)
            }
            Err(err) => {
                info!(reason = %err, "Advice provider unavailable, using built-in advice");
                Self::new(None, timeout)
            }
        }
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// Narrative advice for an analysis
    pub async fn advice(&self, analysis: &AnalysisResult) -> AdvicePayload {
        match self.ask(&advice_prompt(analysis)).await {
            Some(text) => AdvicePayload {
                text,
                source: AdviceSource::Provider,
            },
            None => AdvicePayload::from_rules(&analysis.metrics),
        }
    }

    /// Plan for tonight
    pub async fn today_plan(&self, analysis: &AnalysisResult, now: NaiveDateTime) -> SchedulePlan {
        match self.ask(&schedule_prompt(analysis, now)).await {
            Some(text) => provider_plan(text),
            None => advice::generate_today_plan(&analysis.metrics, now),
        }
    }

    /// Analyse `records` and produce advice and tonight's plan.
    ///
    /// Advice is requested first. If it fails, the schedule is not requested
    /// and both come from the rules; if the schedule fails, both are replaced
    /// by the rule-based versions.
    pub async fn perform_analysis(
        &self,
        records: &[SleepRecord],
        now: NaiveDateTime,
    ) -> AdvisorReport {
        let analysis = advice::analyze(records, now);

        let (advice, plan) = match self.ask(&advice_prompt(&analysis)).await {
            Some(advice_text) => match self.ask(&schedule_prompt(&analysis, now)).await {
                Some(plan_text) => (
                    AdvicePayload {
                        text: advice_text,
                        source: AdviceSource::Provider,
                    },
                    provider_plan(plan_text),
                ),
                None => fallback_pair(&analysis, now),
            },
            None => fallback_pair(&analysis, now),
        };

        AdvisorReport {
            analysis,
            advice,
            plan,
        }
    }

    /// Provider text for a prompt, `None` when absent or failed
    async fn ask(&self, prompt: &str) -> Option<String> {
        let provider = self.provider.as_deref()?;

        match request_text(provider, prompt, self.timeout).await {
            ProviderReply::Text(text) => Some(text),
            ProviderReply::Failed(reason) => {
                warn!(
                    provider = provider.name(),
                    %reason,
                    "Advice provider failed, using fallback"
                );
                None
            }
        }
    }
}

fn fallback_pair(analysis: &AnalysisResult, now: NaiveDateTime) -> (AdvicePayload, SchedulePlan) {
    (
        AdvicePayload::from_rules(&analysis.metrics),
        advice::generate_today_plan(&analysis.metrics, now),
    )
}

fn provider_plan(text: String) -> SchedulePlan {
    SchedulePlan {
        plan_text: text,
        suggested_bedtime_text: PROVIDER_BEDTIME_TEXT.to_string(),
        target_hours: TARGET_NIGHTLY_HOURS,
        source: AdviceSource::Provider,
    }
}

/// Prompt asking for advice; built from the window, metrics and issues only
pub fn advice_prompt(analysis: &AnalysisResult) -> String {
    let metrics = &analysis.metrics;
    let mut prompt = String::from(
        "You are a sleep specialist. Analyse the following sleep data and give advice.\n\n",
    );

    prompt.push_str("Sleep over the last 7 days:\n");
    if analysis.weekly_data.is_empty() {
        prompt.push_str("- no nights logged\n");
    }
    for record in &analysis.weekly_data {
        prompt.push_str(&format!(
            "- {}: {:.1}h, bedtime: {}\n",
            record.date,
            record.duration_hours,
            record.bedtime.format("%-H:%M")
        ));
    }

    prompt.push_str(&format!(
        "\nCurrent metrics:\n\
         - Average sleep: {}h\n\
         - Sleep deficit: {}h\n\
         - Consistency: {}%\n\
         - Quality: {}/100\n\n",
        metrics.average_sleep_hours,
        metrics.deficit_hours,
        metrics.consistency_score,
        metrics.quality_score
    ));

    let issues: Vec<&str> = analysis.issues.iter().map(|i| i.description()).collect();
    prompt.push_str(&format!("Main issues: {}\n\n", issues.join(", ")));

    prompt.push_str(
        "Give concrete advice to improve sleep, including:\n\
         1. An assessment of the current situation\n\
         2. Specific steps to improve\n\
         3. Habits worth changing\n\n\
         Keep the answer short and practical.",
    );

    prompt
}

/// Prompt asking for tonight's plan
pub fn schedule_prompt(analysis: &AnalysisResult, now: NaiveDateTime) -> String {
    let metrics = &analysis.metrics;

    format!(
        "You are a sleep specialist. Create a sleep plan for tonight based on:\n\n\
         Current situation:\n\
         - Average sleep: {}h\n\
         - Sleep deficit: {}h\n\
         - Consistency: {}%\n\
         - Current time: {}\n\n\
         Provide:\n\
         1. Tonight's plan (how many hours and why)\n\
         2. The best bedtime given the current time\n\
         3. Advice on sleep timing\n\n\
         Keep the answer short and practical.",
        metrics.average_sleep_hours,
        metrics.deficit_hours,
        metrics.consistency_score,
        now.format("%-H:%M")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::models::parse_time_of_day;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedProvider {
        replies: Vec<Result<&'static str, u16>>,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(replies: Vec<Result<&'static str, u16>>) -> Self {
            Self {
                replies,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl AdviceProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate_text(&self, _prompt: &str) -> Result<String, ProviderError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            match self.replies.get(call).copied().unwrap_or(Err(500)) {
                Ok(text) => Ok(text.to_string()),
                Err(status) => Err(ProviderError::Status {
                    status,
                    body: String::new(),
                }),
            }
        }
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 9, 23)
            .unwrap()
            .and_hms_opt(20, 0, 0)
            .unwrap()
    }

    fn week() -> Vec<SleepRecord> {
        (17..=23)
            .map(|day| {
                let mut record = SleepRecord::new(
                    NaiveDate::from_ymd_opt(2024, 9, day).unwrap(),
                    parse_time_of_day("23:30").unwrap(),
                    parse_time_of_day("05:30").unwrap(),
                    2,
                    Some("private note".to_string()),
                )
                .unwrap();
                record.duration_hours = 6.0;
                record
            })
            .collect()
    }

    fn advisor_with(provider: ScriptedProvider) -> (SleepAdvisor, Arc<ScriptedProvider>) {
        let provider = Arc::new(provider);
        let advisor = SleepAdvisor::new(
            Some(provider.clone() as Arc<dyn AdviceProvider>),
            Duration::from_secs(5),
        );
        (advisor, provider)
    }

    #[tokio::test]
    async fn test_offline_uses_rules() {
        let advisor = SleepAdvisor::offline();
        assert!(!advisor.has_provider());

        let report = advisor.perform_analysis(&week(), now()).await;
        assert_eq!(report.advice.source, AdviceSource::Fallback);
        assert_eq!(report.advice.text, advice::generate_advice(&report.analysis.metrics));
        assert_eq!(report.plan, advice::generate_today_plan(&report.analysis.metrics, now()));
        // 6h x 7 = 42h, deficit 14 -> 8 + 2
        assert_eq!(report.plan.target_hours, 10.0);
    }

    #[tokio::test]
    async fn test_provider_success() {
        let (advisor, provider) = advisor_with(ScriptedProvider::new(vec![
            Ok("Go to bed earlier."),
            Ok("Sleep 9 hours tonight."),
        ]));

        let report = advisor.perform_analysis(&week(), now()).await;
        assert_eq!(report.advice.text, "Go to bed earlier.");
        assert_eq!(report.advice.source, AdviceSource::Provider);
        assert_eq!(report.plan.plan_text, "Sleep 9 hours tonight.");
        assert_eq!(report.plan.suggested_bedtime_text, PROVIDER_BEDTIME_TEXT);
        assert_eq!(report.plan.target_hours, 8.0);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failing_advice_skips_schedule_request() {
        let (advisor, provider) = advisor_with(ScriptedProvider::new(vec![Err(503)]));

        let report = advisor.perform_analysis(&week(), now()).await;
        assert_eq!(report.advice.source, AdviceSource::Fallback);
        assert_eq!(report.plan.source, AdviceSource::Fallback);
        assert!(!report.advice.text.is_empty());
        assert!(!report.plan.plan_text.is_empty());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failing_schedule_falls_back_for_both() {
        let (advisor, _) = advisor_with(ScriptedProvider::new(vec![Ok("advice"), Err(500)]));

        let report = advisor.perform_analysis(&week(), now()).await;
        assert_eq!(report.advice.source, AdviceSource::Fallback);
        assert_eq!(report.plan.source, AdviceSource::Fallback);
    }

    #[tokio::test]
    async fn test_individual_requests_fall_back() {
        let (advisor, _) = advisor_with(ScriptedProvider::new(vec![Err(401), Ok("plan")]));
        let analysis = advice::analyze(&week(), now());

        let payload = advisor.advice(&analysis).await;
        assert_eq!(payload, AdvicePayload::from_rules(&analysis.metrics));

        let plan = advisor.today_plan(&analysis, now()).await;
        assert_eq!(plan.source, AdviceSource::Provider);
    }

    #[test]
    fn test_prompts_exclude_notes() {
        let analysis = advice::analyze(&week(), now());
        let prompt = advice_prompt(&analysis);

        assert!(prompt.contains("- 2024-09-23: 6.0h, bedtime: 23:30"));
        assert!(prompt.contains("Average sleep: 6h"));
        assert!(prompt.contains("Sleep deficit: 14h"));
        assert!(prompt.contains("Main issues: too little average sleep, significant deficit"));
        assert!(!prompt.contains("private note"));

        let prompt = schedule_prompt(&analysis, now());
        assert!(prompt.contains("Current time: 20:00"));
        assert!(!prompt.contains("private note"));
    }

    #[test]
    fn test_from_config_without_key_runs_offline() {
        let config = AdvisorConfig {
            api_key_env: "SLEEPRS_TEST_MISSING_KEY".to_string(),
            ..AdvisorConfig::default()
        };
        assert!(!SleepAdvisor::from_config(&config).has_provider());

        let disabled = AdvisorConfig {
            enabled: false,
            ..AdvisorConfig::default()
        };
        assert!(!SleepAdvisor::from_config(&disabled).has_provider());
    }
}
