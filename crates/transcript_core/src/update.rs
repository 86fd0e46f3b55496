use crate::{AppState, Effect, LogLevel, Msg, PipelineEvent, Severity};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::FilesSelected(selections) => {
            if selections.is_empty() {
                return (state, Vec::new());
            }
            let added = state.add_files(selections);
            if added == 0 {
                Vec::new()
            } else {
                vec![notify(format!("Added {added} file(s)"), Severity::Information)]
            }
        }
        Msg::LanguageChanged { job_id, language } => {
            // Languages are locked once a run owns the list.
            if !state.is_processing() {
                state.set_language(job_id, language);
            }
            Vec::new()
        }
        Msg::RemoveJob { job_id } => {
            if state.is_processing() {
                vec![notify("Cannot remove while processing", Severity::Warning)]
            } else {
                state.remove_job(job_id);
                Vec::new()
            }
        }
        Msg::ClearClicked => {
            if state.is_processing() {
                vec![notify("Cannot clear while processing", Severity::Warning)]
            } else {
                state.clear();
                Vec::new()
            }
        }
        Msg::StartClicked => {
            if state.is_processing() {
                vec![notify("Already processing", Severity::Warning)]
            } else if state.pending_count() == 0 {
                vec![notify("No pending files to process", Severity::Warning)]
            } else {
                let jobs = state.begin_run();
                vec![Effect::StartRun { jobs }]
            }
        }
        Msg::Pipeline(event) => {
            apply_pipeline_event(&mut state, event);
            Vec::new()
        }
        Msg::RunFinished { jobs, error } => {
            if let Some(message) = error {
                state.push_log(format!("Run failed: {message}"), LogLevel::Error);
            }
            state.finish_run(Some(jobs));
            Vec::new()
        }
    };

    (state, effects)
}

fn apply_pipeline_event(state: &mut AppState, event: PipelineEvent) {
    match event {
        PipelineEvent::Log { message, level } => state.push_log(message, level),
        PipelineEvent::JobStatus { job } => state.apply_job_snapshot(job),
        PipelineEvent::Progress { steps } => state.advance_progress(steps),
        PipelineEvent::StatusLabel { label } => state.set_status_label(label),
        PipelineEvent::Done => state.finish_run(None),
        PipelineEvent::Error { message } => state.push_log(message, LogLevel::Error),
        PipelineEvent::Ping => {}
    }
}

fn notify(message: impl Into<String>, severity: Severity) -> Effect {
    Effect::Notify {
        message: message.into(),
        severity,
    }
}
