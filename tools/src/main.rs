//! mix-runner: headless media-mix simulator.
//!
//! Usage:
//!   mix-runner --industry 보험 --month 1 --budget 10000000 --mix 네이버_SA=60,메타_DA=40
//!   mix-runner --industry 패션 --month 11 --budget 50000000 --goal conversion --export out/
//!   mix-runner --industry 교육 --month 2 --goal balanced --target-conversions 500 --target-cpa 40000
//!   mix-runner --ipc-mode

use anyhow::{bail, Context, Result};
use mediamix_core::{
    config::ReferenceTables,
    export,
    insights::{Insight, InsightEngine},
    planner::{self, CampaignGoal, TargetPlan, TargetRequest},
    scenario::ScenarioKind,
    simulation::{AllocationLine, MediaOutcome, SimulationReport, SimulationRequest, Simulator},
    validation::{self, Field, Verdict},
};
use std::env;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    Simulate {
        request: SimulationRequest,
    },
    Validate {
        field: String,
        value: f64,
        #[serde(default)]
        industry: Option<String>,
    },
    Plan {
        request: TargetRequest,
    },
    Industries,
    Quit,
}

#[derive(serde::Serialize)]
struct SimulationReply<'a> {
    report: &'a SimulationReport,
    insights: Vec<Insight>,
}

#[derive(serde::Serialize)]
struct ValidationReply<'a> {
    field: &'a str,
    value: f64,
    verdict: Verdict,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let data_dir = arg_value(&args, "--data-dir").unwrap_or("./data");

    let tables = ReferenceTables::load(data_dir)
        .with_context(|| format!("loading reference tables from {data_dir}"))?;
    let insight_engine = InsightEngine::build();
    let mut simulator = Simulator::new(&tables);

    if ipc_mode {
        return run_ipc_loop(&mut simulator, &insight_engine);
    }

    let industry = arg_value(&args, "--industry").unwrap_or("보험").to_string();
    let month = parse_arg(&args, "--month", 1u32);
    let budget = parse_arg(&args, "--budget", 10_000_000.0f64);
    let goal = arg_value(&args, "--goal")
        .map(str::parse::<CampaignGoal>)
        .transpose()?;

    println!("Media Mix Simulator: mix-runner");
    println!("  data_dir:  {data_dir}");
    println!("  industry:  {industry}");
    println!("  month:     {month}");
    println!();

    let report = if let Some(target) = arg_value(&args, "--target-conversions") {
        let request = TargetRequest {
            industry,
            month,
            target_conversions: target.parse().context("--target-conversions")?,
            target_cpa: parse_arg(&args, "--target-cpa", tables.settings().fallback_industry_cpa),
            goal: goal.unwrap_or(CampaignGoal::Balanced),
            excluded: list_arg(&args, "--exclude"),
            confidence: parse_arg(&args, "--confidence", 1.0f64),
        };
        let plan = TargetPlan::plan(&mut simulator, &request)?;
        print_plan(&plan);
        plan.report
    } else {
        let allocation = match arg_value(&args, "--mix") {
            Some(mix) => parse_mix(mix)?,
            None => planner::auto_allocation(
                &tables,
                goal.unwrap_or(CampaignGoal::Balanced),
                &list_arg(&args, "--exclude"),
            )?,
        };
        let request = SimulationRequest { industry, month, total_budget: budget, allocation, goal };
        simulator.run(&request)?
    };

    print_report(&report);
    print_insights(&insight_engine.evaluate(&report, &tables));

    if let Some(target) = arg_value(&args, "--export") {
        let path = export_path(target);
        export::write_scenario_file(&report, ScenarioKind::Base, &path)?;
        println!();
        println!("  exported:  {}", path.display());
    }

    Ok(())
}

fn run_ipc_loop(simulator: &mut Simulator<'_>, insight_engine: &InsightEngine) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                write_error(&mut stdout, &e.to_string())?;
                continue;
            }
        };

        let reply = match cmd {
            IpcCommand::Quit => break,
            IpcCommand::Simulate { request } => simulator.run(&request).and_then(|report| {
                let insights = insight_engine.evaluate(&report, simulator.tables());
                Ok(serde_json::to_value(SimulationReply { report: &report, insights })?)
            }),
            IpcCommand::Validate { field, value, industry } => field.parse::<Field>().and_then(|f| {
                let verdict = validation::validate(simulator.tables(), f, value, industry.as_deref());
                Ok(serde_json::to_value(ValidationReply { field: f.name(), value, verdict })?)
            }),
            IpcCommand::Plan { request } => TargetPlan::plan(simulator, &request)
                .and_then(|plan| Ok(serde_json::to_value(plan)?)),
            IpcCommand::Industries => Ok(serde_json::json!({
                "industries": simulator.tables().available_industries(),
            })),
        };

        match reply {
            Ok(value) => {
                writeln!(stdout, "{}", serde_json::to_string(&value)?)?;
                stdout.flush()?;
            }
            Err(e) => {
                log::warn!("ipc: {e}");
                write_error(&mut stdout, &e.to_string())?;
            }
        }
    }
    Ok(())
}

fn write_error(stdout: &mut io::Stdout, message: &str) -> Result<()> {
    let err_json = serde_json::json!({ "error": message });
    writeln!(stdout, "{err_json}")?;
    stdout.flush()?;
    Ok(())
}

fn print_report(report: &SimulationReport) {
    println!("=== MEDIA RESULTS (season factor {:.3}) ===", report.season_factor);
    for row in &report.rows {
        match row {
            MediaOutcome::Computed(r) => println!(
                "  {:<14} {:>5.1}% | clicks {:>9.0} | conv {:>7.1} | CPA {:>9} | ROAS {:>6.1}% | {}",
                r.display_name,
                r.share,
                r.clicks,
                r.adjusted_conversions,
                r.adjusted_cpa.map(|c| format!("{c:.0}")).unwrap_or_else(|| "-".into()),
                r.roas,
                r.grade,
            ),
            MediaOutcome::Uncomputable { display_name, share, reason, .. } => {
                println!("  {display_name:<14} {share:>5.1}% | not computed: {reason}")
            }
        }
    }

    let s = &report.summary;
    println!();
    println!("=== SUMMARY ===");
    println!("  report_id:      {}", report.report_id);
    println!("  media:          {} computed, {} failed", s.computed_media, s.uncomputable_media);
    println!("  spend:          {:.0}", s.total_spend);
    println!("  impressions:    {:.0}", s.total_impressions);
    println!("  clicks:         {:.0}", s.total_clicks);
    println!("  conversions:    {:.1}", s.total_conversions);
    println!(
        "  avg CPA:        {}",
        s.blended_cpa.map(|c| format!("{c:.0}")).unwrap_or_else(|| "-".into())
    );
    println!("  ROAS:           {:.1}%", s.blended_roas);
    println!("  grade:          {}", s.grade);

    println!();
    println!("=== SCENARIOS ===");
    for sc in &report.scenarios {
        println!(
            "  {:<13} conv {:>8.1} | ROAS {:>6.1}% | {}",
            sc.kind.as_str(),
            sc.total_conversions,
            sc.avg_roas,
            sc.grade
        );
    }

    for advisory in &report.advisories {
        let scope = advisory.media_key.as_deref().unwrap_or("request");
        println!("  [advisory] {scope}: {}", advisory.message);
    }
}

fn print_plan(plan: &TargetPlan) {
    println!("=== TARGET PLAN ===");
    println!("  required budget:  {:.0}", plan.required_budget);
    println!("  predicted conv:   {:.1}", plan.predicted_conversions);
    println!(
        "  predicted CPA:    {}",
        plan.predicted_cpa.map(|c| format!("{c:.0}")).unwrap_or_else(|| "-".into())
    );
    println!("  achievement:      {:.1}%", plan.achievement_rate);
    println!("  outlook:          {}", plan.outlook.message());
    println!();
}

fn print_insights(insights: &[Insight]) {
    if insights.is_empty() {
        return;
    }
    println!();
    println!("=== INSIGHTS ===");
    for i in insights {
        println!("  [{:?}] {}: {}", i.kind, i.title, i.message);
    }
}

/// `key=share,key=share`
fn parse_mix(mix: &str) -> Result<Vec<AllocationLine>> {
    mix.split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| {
            let Some((key, share)) = part.split_once('=') else {
                bail!("--mix entry '{part}' must look like key=share");
            };
            let share: f64 = share
                .trim()
                .parse()
                .with_context(|| format!("--mix share for {key}"))?;
            Ok(AllocationLine::new(key.trim(), share))
        })
        .collect()
}

/// A target ending in `.csv` is used as-is; anything else is a directory.
fn export_path(target: &str) -> PathBuf {
    let path = Path::new(target);
    if path.extension().is_some_and(|ext| ext == "csv") {
        path.to_path_buf()
    } else {
        path.join(export::export_filename("mediamix", chrono::Utc::now()))
    }
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn list_arg(args: &[String], flag: &str) -> Vec<String> {
    arg_value(args, flag)
        .map(|v| v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
        .unwrap_or_default()
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
