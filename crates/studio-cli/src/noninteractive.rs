use anyhow::Result;
use std::sync::Arc;
use studio_core::backend::GenerationRequest;
use studio_core::catalog::{BackendId, BackendInfo, Resolution};
use studio_core::error::SessionError;
use studio_core::history::ResultRef;
use studio_core::notify::{Notifier, TracingNotifier};

pub struct GenerateArgs {
    pub prompt: String,
    pub backend: Option<BackendId>,
    pub resolution: Option<Resolution>,
    pub image: Option<String>,
    pub aspect_ratio: Option<String>,
}

pub async fn run(
    app: super::App,
    args: GenerateArgs,
    output_format: super::OutputFormat,
    quiet: bool,
) -> Result<()> {
    let editing = args.image.is_some();
    let backend = app.backend(args.backend, editing)?;
    let info = backend.info().clone();

    // JSON output owns stdout; notices go to the log instead
    let notifier: Arc<dyn Notifier> = match output_format {
        super::OutputFormat::Json => Arc::new(TracingNotifier),
        super::OutputFormat::Text => Arc::new(super::output::ConsoleNotifier::new(quiet)),
    };
    let session = app.new_session(args.image, notifier);

    let resolution = args
        .resolution
        .unwrap_or(app.config.generation.resolution);
    let mut request = GenerationRequest::new(args.prompt.clone()).with_resolution(resolution);
    if let Some(ar) = args.aspect_ratio {
        request = request.with_aspect_ratio(ar);
    }

    if !quiet {
        eprintln!("\x1b[90mGenerating with {}...\x1b[0m", info.display_name);
    }

    let outcome = session.run(backend.as_ref(), request).await;
    let cost = info.cost(resolution).unwrap_or_default();
    if let Ok(result) = &outcome {
        app.record(session.id(), info.id, &args.prompt, result, cost)
            .await;
    }
    let remaining = session.credits().await.ok();

    if let (Ok(_), super::OutputFormat::Text, false, Some(left)) =
        (&outcome, &output_format, quiet, remaining)
    {
        eprintln!("\x1b[90m[credits] {cost} used, {left} left\x1b[0m");
    }
    if let Some(out) = render(&outcome, &output_format, &info, cost, remaining) {
        println!("{out}");
    }

    if outcome.is_err() {
        std::process::exit(1);
    }
    Ok(())
}

/// What goes to stdout. Text-mode failures print nothing there; the
/// notifier already reported them on stderr.
fn render(
    outcome: &Result<ResultRef, SessionError>,
    output_format: &super::OutputFormat,
    info: &BackendInfo,
    cost: u64,
    remaining: Option<u64>,
) -> Option<String> {
    match (outcome, output_format) {
        (Ok(result), super::OutputFormat::Text) => Some(result.to_string()),
        (Err(_), super::OutputFormat::Text) => None,
        (_, super::OutputFormat::Json) => {
            let output = match outcome {
                Ok(result) => serde_json::json!({
                    "result": result.as_str(),
                    "backend": info.id.as_str(),
                    "cost": cost,
                    "credits_remaining": remaining,
                }),
                Err(e) => serde_json::json!({
                    "error": e.to_string(),
                    "credits_remaining": remaining,
                }),
            };
            Some(serde_json::to_string_pretty(&output).unwrap_or_else(|_| output.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OutputFormat;
    use studio_core::catalog::get_backend_info;

    #[test]
    fn test_text_failure_prints_nothing_on_stdout() {
        let info = get_backend_info(BackendId::Seedream).unwrap();
        let err = Err(SessionError::RemoteUnavailable("timeout".into()));

        assert_eq!(render(&err, &OutputFormat::Text, &info, 1, Some(3)), None);

        let ok = Ok(ResultRef::from("https://cdn.example/1.png"));
        assert_eq!(
            render(&ok, &OutputFormat::Text, &info, 1, Some(3)).as_deref(),
            Some("https://cdn.example/1.png")
        );
    }

    #[test]
    fn test_json_reports_failures() {
        let info = get_backend_info(BackendId::Seedream).unwrap();
        let err = Err(SessionError::InvalidResult);

        let out = render(&err, &OutputFormat::Json, &info, 1, Some(3)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["error"], "Generation returned no usable result");
        assert_eq!(value["credits_remaining"], 3);
        assert!(value.get("result").is_none());
    }
}
