use futures::executor::block_on;
use rig::client::completion::CompletionClient;
use rig::completion::Prompt;
use rig::providers::openai;
use std::future::IntoFuture;

use crate::app::{App, AppError};
use crate::domain::field::{FieldLog, Location, Plot, TrialRecord};
use crate::domain::inventory::Variety;

const PREAMBLE: &str = "You are an agronomic advisor for industrial hemp trials. \
Answer with practical, field-ready guidance grounded in the plot context you are given. \
Be concise and concrete; say so when the data is insufficient.";

// Context windows are finite; the prompt carries only the latest few.
const MAX_RECORDS: usize = 5;
const MAX_LOGS: usize = 8;

/// Ask the advisor about one plot. The prompt carries the plot, its
/// variety and location, recent measurements, and recent logs.
pub fn advise_plot(app: &App, plot_id: &str, question: &str) -> Result<String, AppError> {
    let plot: Plot = app.require(plot_id)?;
    let variety: Option<Variety> = app.get(&plot.variety_id)?;
    let location: Option<Location> = app.get(&plot.location_id)?;

    let mut records: Vec<TrialRecord> = app
        .list::<TrialRecord>()?
        .into_iter()
        .filter(|record| record.plot_id == plot.id)
        .collect();
    records.sort_by(|a, b| b.recorded_on.cmp(&a.recorded_on));
    records.truncate(MAX_RECORDS);

    let mut logs: Vec<FieldLog> = app
        .list::<FieldLog>()?
        .into_iter()
        .filter(|log| log.plot_id.as_deref() == Some(plot.id.as_str()))
        .collect();
    logs.sort_by(|a, b| b.logged_on.cmp(&a.logged_on));
    logs.truncate(MAX_LOGS);

    let prompt = build_prompt(&plot, variety.as_ref(), location.as_ref(), &records, &logs, question);
    run_prompt(app, &prompt)
}

/// Free-form question with no plot context.
pub fn advise_general(app: &App, question: &str) -> Result<String, AppError> {
    run_prompt(app, question)
}

fn build_prompt(
    plot: &Plot,
    variety: Option<&Variety>,
    location: Option<&Location>,
    records: &[TrialRecord],
    logs: &[FieldLog],
    question: &str,
) -> String {
    let mut prompt = String::new();
    prompt.push_str(&format!(
        "Plot {} (stage: {}",
        plot.code, plot.stage
    ));
    if let Some(area) = plot.area_m2 {
        prompt.push_str(&format!(", {area:.0} m2"));
    }
    if let Some(sown_on) = plot.sown_on.as_deref() {
        prompt.push_str(&format!(", sown {sown_on}"));
    }
    prompt.push_str(")\n");

    if let Some(variety) = variety {
        prompt.push_str(&format!("Variety: {} ({})", variety.name, variety.purpose));
        if let Some(cycle_days) = variety.cycle_days {
            prompt.push_str(&format!(", cycle {cycle_days} days"));
        }
        prompt.push('\n');
    }
    if let Some(location) = location {
        prompt.push_str(&format!("Location: {}", location.name));
        if let Some(soil) = location.soil_type.as_deref() {
            prompt.push_str(&format!(", soil {soil}"));
        }
        prompt.push('\n');
    }

    if !records.is_empty() {
        prompt.push_str("Recent measurements:\n");
        for record in records {
            prompt.push_str(&format!("- {}:", record.recorded_on));
            if let Some(height_cm) = record.height_cm {
                prompt.push_str(&format!(" height {height_cm:.0} cm"));
            }
            if let Some(yield_kg) = record.yield_kg {
                prompt.push_str(&format!(" yield {yield_kg:.1} kg"));
            }
            if let Some(moisture_pct) = record.moisture_pct {
                prompt.push_str(&format!(" moisture {moisture_pct:.1}%"));
            }
            if let Some(notes) = record.notes.as_deref() {
                prompt.push_str(&format!(" ({notes})"));
            }
            prompt.push('\n');
        }
    }

    if !logs.is_empty() {
        prompt.push_str("Recent field logs:\n");
        for log in logs {
            prompt.push_str(&format!(
                "- {} [{}] {}\n",
                log.logged_on, log.category, log.summary
            ));
        }
    }

    prompt.push_str(&format!("\nQuestion: {question}\n"));
    prompt
}

fn run_prompt(app: &App, prompt: &str) -> Result<String, AppError> {
    let settings = app.settings();
    let api_key = settings
        .resolve_advisor_key()
        .ok_or(AppError::AdvisorNotConfigured)?;

    // The annotation pins the provider's default generics.
    let client: openai::Client = openai::Client::new(&api_key)
        .map_err(|err| AppError::Invalid(format!("advisor client error: {err}")))?;
    let agent = client
        .agent(&settings.advisor.model)
        .preamble(PREAMBLE)
        .temperature(settings.advisor.temperature)
        .build();

    let answer: Result<String, _> = block_on(agent.prompt(prompt).into_future());
    answer.map_err(|err| AppError::Invalid(format!("advisor request failed: {err}")))
}

#[cfg(test)]
mod tests {
    use super::build_prompt;
    use crate::domain::field::{FieldLog, Location, LogCategory, Plot, PlotStage, TrialRecord};
    use crate::domain::inventory::{Variety, VarietyPurpose};

    fn plot() -> Plot {
        Plot {
            id: "plt-1".to_string(),
            code: "A1".to_string(),
            project_id: "prj-1".to_string(),
            location_id: "loc-1".to_string(),
            variety_id: "var-1".to_string(),
            area_m2: Some(250.0),
            stage: PlotStage::Growing,
            seed_batch_id: None,
            sown_on: Some("2026-04-20".to_string()),
            harvested_on: None,
            updated_at: "2026-05-01T10:00:00Z".to_string(),
        }
    }

    #[test]
    fn prompt_carries_plot_variety_and_question() {
        let variety = Variety {
            id: "var-1".to_string(),
            name: "Futura 75".to_string(),
            breeder: None,
            purpose: VarietyPurpose::Fiber,
            cycle_days: Some(120),
            notes: None,
        };
        let location = Location {
            id: "loc-1".to_string(),
            name: "North field".to_string(),
            latitude: None,
            longitude: None,
            area_ha: None,
            soil_type: Some("clay loam".to_string()),
        };
        let records = vec![TrialRecord {
            id: "trl-1".to_string(),
            plot_id: "plt-1".to_string(),
            recorded_on: "2026-06-10".to_string(),
            stage: None,
            height_cm: Some(80.0),
            yield_kg: None,
            moisture_pct: None,
            notes: None,
        }];
        let logs = vec![FieldLog {
            id: "log-1".to_string(),
            plot_id: Some("plt-1".to_string()),
            logged_on: "2026-06-11".to_string(),
            category: LogCategory::Pest,
            summary: "aphids on lower leaves".to_string(),
            details: None,
        }];

        let prompt = build_prompt(
            &plot(),
            Some(&variety),
            Some(&location),
            &records,
            &logs,
            "should I treat?",
        );

        assert!(prompt.contains("Plot A1"));
        assert!(prompt.contains("Futura 75"));
        assert!(prompt.contains("clay loam"));
        assert!(prompt.contains("height 80 cm"));
        assert!(prompt.contains("aphids on lower leaves"));
        assert!(prompt.trim_end().ends_with("Question: should I treat?"));
    }

    #[test]
    fn prompt_omits_empty_sections() {
        let prompt = build_prompt(&plot(), None, None, &[], &[], "when to harvest?");
        assert!(!prompt.contains("Recent measurements"));
        assert!(!prompt.contains("Recent field logs"));
        assert!(prompt.contains("when to harvest?"));
    }
}
