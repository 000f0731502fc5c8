use anyhow::{bail, Context, Result};
use geoflow_core::config::LayeredConfig;
use geoflow_core::models::{JobId, JobStatus, Parameters};
use geoflow_workflow::{JobEvent, Session};
use tokio::sync::broadcast::error::RecvError;

use crate::cli::RunArgs;
use crate::output::OutputWriter;
use crate::output_types::{DatasetRow, LayerRow, RunOutput, StepRow};
use crate::progress::{create_job_bar, create_spinner, finish_error, finish_success};

pub async fn execute(args: RunArgs, config: &LayeredConfig, output: &OutputWriter) -> Result<()> {
    let settings = config.settings();
    let mut session = Session::in_memory(&settings);

    // Reject an export the tier cannot use before doing any work
    if args.export.is_some() {
        session.export_format(&args.export_format)?;
    }

    // Upload every file before picking the dataset to analyze
    let mut uploaded = Vec::with_capacity(args.files.len());
    for path in &args.files {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("Invalid file path: {}", path.display()))?;

        let spinner = create_spinner(&format!("Uploading {}...", file_name), output.is_json());
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        match session.upload(file_name, &bytes).await {
            Ok(dataset) => {
                finish_success(
                    &spinner,
                    &format!("Registered {} ({})", dataset.name, dataset.kind),
                );
                uploaded.push(dataset);
            }
            Err(e) => {
                finish_error(&spinner, &format!("Upload failed: {}", file_name));
                return Err(e.into());
            }
        }
    }

    let Some(target) = uploaded.get(args.dataset) else {
        bail!(
            "Dataset index {} is out of range ({} file(s) uploaded)",
            args.dataset,
            uploaded.len()
        );
    };
    session.select_dataset(target.id)?;
    let tool = session.select_tool(&args.tool)?;

    let parameters: Parameters = args.params.into_iter().collect();

    // Subscribe before submitting so no progress event is missed
    let mut events = session.subscribe();
    let job = session.submit(&parameters).await?;
    tracing::info!(job_id = %job.id, tool = %tool.id, "Job started");

    let bar = create_job_bar(&format!("Running {}", tool.name), output.is_json());
    follow_job(&mut session, job.id, &mut events, &bar).await?;

    let job = session.wait(job.id).await?;
    match job.status {
        JobStatus::Completed => finish_success(&bar, &format!("{} completed", tool.name)),
        _ => finish_error(
            &bar,
            job.error_message.as_deref().unwrap_or("Analysis failed"),
        ),
    }

    let export_path = match &args.export {
        Some(path) => {
            let artifact = session.export(&args.export_format)?;
            let json = serde_json::to_string_pretty(&artifact.payload)?;
            tokio::fs::write(path, json)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            Some(path.display().to_string())
        }
        None => None,
    };

    let report = RunOutput {
        datasets: session.datasets(),
        layers: session.ordered_layers(),
        view: session.view(),
        steps: session.steps(),
        workflow_progress: session.workflow_progress(),
        export_path,
        job,
    };

    if output.is_json() {
        output.result(&report)?;
    } else {
        print_report(&report, output)?;
    }

    if report.job.status != JobStatus::Completed {
        bail!(
            "{} failed: {}",
            report.job.id,
            report.job.error_message.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

/// Mirror job progress onto the bar until the job ends. Ctrl-C cancels it.
async fn follow_job(
    session: &mut Session,
    job_id: JobId,
    events: &mut tokio::sync::broadcast::Receiver<JobEvent>,
    bar: &indicatif::ProgressBar,
) -> Result<()> {
    loop {
        if session.job(job_id)?.status.is_terminal() {
            return Ok(());
        }

        tokio::select! {
            event = events.recv() => match event {
                Ok(JobEvent::Progress { job_id: id, percent }) if id == job_id => {
                    bar.set_position(u64::from(percent));
                }
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => return Ok(()),
            },
            _ = tokio::signal::ctrl_c() => {
                if let Err(e) = session.cancel(job_id) {
                    tracing::warn!(job_id = %job_id, error = %e, "Could not cancel job");
                }
                return Ok(());
            }
        }
    }
}

fn print_report(report: &RunOutput, output: &OutputWriter) -> Result<()> {
    output.section("Datasets");
    output.table(report.datasets.iter().map(DatasetRow::from).collect());

    output.section("Job");
    output.kv("ID", report.job.id);
    output.kv("Tool", &report.job.tool_name);
    output.kv("Status", report.job.status);
    output.kv("Progress", format!("{}%", report.job.progress));
    if let Some(result) = &report.job.result {
        output.section("Results");
        output.data(&result["results"])?;
    }

    output.section("Layers");
    output.table(report.layers.iter().map(LayerRow::from).collect());
    output.kv(
        "View",
        format!(
            "{:.4}, {:.4} @ zoom {}",
            report.view.center[1], report.view.center[0], report.view.zoom
        ),
    );

    output.section(format!("Workflow ({}% complete)", report.workflow_progress));
    output.table(report.steps.iter().map(StepRow::from).collect());

    if let Some(path) = &report.export_path {
        output.success(format!("Exported visible layers to {}", path));
    }
    Ok(())
}
