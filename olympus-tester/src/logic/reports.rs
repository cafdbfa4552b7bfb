use anyhow::Result;
use colored::Colorize;
use std::io::Write;
use std::time::Duration;

use super::SimulationSummary;

fn success_rate(results: &[SimulationSummary]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    let passed = results.iter().filter(|r| r.passed()).count();
    #[allow(clippy::cast_precision_loss)]
    let rate = passed as f64 / results.len() as f64 * 100.0;
    rate
}

pub fn generate_console_report<W: Write + ?Sized>(
    out: &mut W,
    results: &[SimulationSummary],
    total_duration: Duration,
) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📊 Simulation Results Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "=============================".cyan())?;

    let total = results.len();
    let passed = results.iter().filter(|r| r.passed()).count();
    writeln!(out, "Total runs: {total}")?;
    writeln!(out, "Passed: {}", passed.to_string().green())?;
    writeln!(out, "Failed: {}", (total - passed).to_string().red())?;
    writeln!(out, "Success rate: {:.1}%", success_rate(results))?;
    writeln!(out, "Total time: {total_duration:?}")?;
    writeln!(out)?;

    for result in results {
        let status = if result.passed() {
            "✅ PASS".green()
        } else {
            "❌ FAIL".red()
        };
        writeln!(
            out,
            "{status} {} (seed {})",
            result.scenario.bold(),
            result.seed
        )?;
        writeln!(
            out,
            "   Tier {} | boss {}/{} HP | {} defeated | {} damage over {} days",
            result.final_tier,
            result.boss_current_hp,
            result.boss_max_hp,
            result.bosses_defeated,
            result.total_damage,
            result.days
        )?;
        writeln!(
            out,
            "   Rewards: {} earned, {} claimed, {} banked, {} expired",
            result.rewards_earned,
            result.rewards_claimed,
            result.rewards_banked,
            result.rewards_expired
        )?;
        writeln!(
            out,
            "   Tartarus: {} visits, {} escapes, {} wrath | best streak {}",
            result.tartarus_visits,
            result.tartarus_escapes,
            result.wrath_triggers,
            result.longest_streak
        )?;
        if !result.violations.is_empty() {
            writeln!(out, "   Violations:")?;
            for violation in &result.violations {
                writeln!(out, "     • {}", violation.red())?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

pub fn generate_json_report<W: Write + ?Sized>(
    out: &mut W,
    results: &[SimulationSummary],
) -> Result<()> {
    let json_output = serde_json::to_string_pretty(results)?;
    writeln!(out, "{json_output}")?;
    Ok(())
}

pub fn generate_markdown_report<W: Write + ?Sized>(
    out: &mut W,
    results: &[SimulationSummary],
) -> Result<()> {
    writeln!(out, "# Olympus Simulation Results\n")?;

    let total = results.len();
    let passed = results.iter().filter(|r| r.passed()).count();
    writeln!(out, "## Summary\n")?;
    writeln!(out, "- **Total runs**: {total}")?;
    writeln!(out, "- **Passed**: {passed}")?;
    writeln!(out, "- **Failed**: {}", total - passed)?;
    writeln!(out, "- **Success rate**: {:.1}%\n", success_rate(results))?;

    writeln!(out, "## Runs\n")?;
    writeln!(
        out,
        "| Scenario | Seed | Tier | Defeated | Damage | Rewards | Expired | Tartarus | Streak |"
    )?;
    writeln!(out, "|---|---|---|---|---|---|---|---|---|")?;
    for r in results {
        let status = if r.passed() { "✅" } else { "❌" };
        writeln!(
            out,
            "| {status} {} | {} | {} | {} | {} | {} | {} | {} | {} |",
            r.scenario,
            r.seed,
            r.final_tier,
            r.bosses_defeated,
            r.total_damage,
            r.rewards_earned,
            r.rewards_expired,
            r.tartarus_visits,
            r.longest_streak
        )?;
    }

    let failing: Vec<_> = results.iter().filter(|r| !r.passed()).collect();
    if !failing.is_empty() {
        writeln!(out, "\n## Violations\n")?;
        for r in failing {
            writeln!(out, "### {} (seed {})\n", r.scenario, r.seed)?;
            for violation in &r.violations {
                writeln!(out, "- {violation}")?;
            }
            writeln!(out)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(violations: Vec<String>) -> SimulationSummary {
        SimulationSummary {
            scenario: "steady".to_string(),
            seed: 9,
            days: 14,
            final_tier: 3,
            total_damage: 120,
            violations,
            ..SimulationSummary::default()
        }
    }

    #[test]
    fn markdown_lists_runs_and_violations() {
        let results = vec![sample(Vec::new()), sample(vec!["day 3: boom".to_string()])];
        let mut buf = Vec::new();
        generate_markdown_report(&mut buf, &results).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("# Olympus Simulation Results"));
        assert!(text.contains("- **Success rate**: 50.0%"));
        assert!(text.contains("| ✅ steady | 9 | 3 |"));
        assert!(text.contains("- day 3: boom"));
    }

    #[test]
    fn json_report_is_an_array_of_summaries() {
        let mut buf = Vec::new();
        generate_json_report(&mut buf, &[sample(Vec::new())]).unwrap();
        let parsed: Vec<SimulationSummary> = serde_json::from_slice(&buf).unwrap();
        assert_eq!(parsed, vec![sample(Vec::new())]);
    }

    #[test]
    fn console_report_mentions_each_run() {
        colored::control::set_override(false);
        let mut buf = Vec::new();
        generate_console_report(&mut buf, &[sample(Vec::new())], Duration::from_millis(5))
            .unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("Total runs: 1"));
        assert!(text.contains("PASS steady (seed 9)"));
    }
}
