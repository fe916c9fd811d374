//! End-to-end tagging runs through the workflow orchestrator

mod helpers;

use helpers::*;
use skilltag_common::events::{EventBus, TaggingEvent};
use skilltag_pipeline::models::{PipelineState, Round, RunOutcome};
use skilltag_pipeline::services::{ClassifyError, StubClassifier};
use skilltag_pipeline::PipelineError;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

/// C1 valid in Round 1, C2 corrected in Round 2, C3 never resolved
fn two_round_classifier() -> Arc<ScriptedClassifier> {
    Arc::new(ScriptedClassifier::new(|req| {
        Ok(match (req.round, title_of(req).as_str()) {
            (Round::R1, "Course C1") => 2,
            (Round::R1, "Course C2") => 4,
            (Round::R2, "Course C2") => 3,
            _ => 0,
        })
    }))
}

fn two_round_courses() -> Vec<skilltag_pipeline::models::CourseRow> {
    let mut missing_title = course_row("C5", "Data Analysis");
    missing_title.course_title = None;
    let mut missing_about = course_row("C6", "Data Analysis");
    missing_about.about = Some("   ".to_string());

    vec![
        course_row("C1", "Data Analysis"),
        course_row("C2", "Data Analysis"),
        course_row("C3", "Data Analysis"),
        course_row("C1", "Data Analysis"),
        course_row("C4", "Pottery"),
        missing_title,
        missing_about,
    ]
}

fn drain(rx: &mut tokio::sync::broadcast::Receiver<TaggingEvent>) -> Vec<TaggingEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_two_round_run_partitions_every_course() {
    let dirs = TestDirs::new();
    let classifier = two_round_classifier();
    let orchestrator = orchestrator(
        classifier.clone(),
        &dirs,
        fast_settings(),
        EventBus::new(1024),
    );

    let outcome = orchestrator
        .execute(
            inputs(framework("Data Analysis", "HR", &[1, 2, 3]), two_round_courses()),
            CancellationToken::new(),
        )
        .await
        .unwrap();
    let report = outcome.report().unwrap();

    // Round 1 sees the three in-sector courses once; Round 2 only the rejects
    assert_eq!(classifier.calls_in(Round::R1).len(), 3);
    let r2: BTreeSet<String> = classifier
        .calls_in(Round::R2)
        .into_iter()
        .map(|c| c.course_title)
        .collect();
    assert_eq!(
        r2,
        BTreeSet::from(["Course C2".to_string(), "Course C3".to_string()])
    );
    assert!(classifier.calls_in(Round::R1).iter().all(|c| !c.had_chart));
    assert!(classifier.calls_in(Round::R2).iter().all(|c| c.had_chart));

    let valid: Vec<(&str, u8, Round)> = report
        .valid
        .iter()
        .map(|r| (r.course_ref_id.as_str(), r.proficiency_level, r.source_round))
        .collect();
    assert_eq!(valid, vec![("C1", 2, Round::R1), ("C2", 3, Round::R2)]);

    assert_eq!(report.invalid.len(), 1);
    assert_eq!(report.invalid[0].course_ref_id, "C3");
    assert_eq!(report.invalid[0].proficiency_level, 0);
    assert_eq!(report.invalid[0].source_round, Round::R2);

    assert_eq!(report.out_of_sector.len(), 1);
    assert_eq!(report.out_of_sector[0].course_ref_id, "C4");
    assert_eq!(report.missing_content.len(), 1);
    assert_eq!(report.missing_content[0].course_ref_id.as_deref(), Some("C5"));
    assert_eq!(report.poor_quality.len(), 1);
    assert_eq!(report.poor_quality[0].course_ref_id.as_deref(), Some("C6"));

    assert_eq!(report.statistics.calls_issued, 5);
    assert_eq!(report.statistics.r1_valid, 1);
    assert_eq!(report.statistics.r1_invalid, 2);
    assert_eq!(report.statistics.r2_valid, 1);
    assert_eq!(report.statistics.r2_invalid, 1);
}

#[tokio::test]
async fn test_artifacts_written_and_checkpoint_removed() {
    let dirs = TestDirs::new();
    let orchestrator = orchestrator(
        two_round_classifier(),
        &dirs,
        fast_settings(),
        EventBus::new(1024),
    );

    let outcome = orchestrator
        .execute(
            inputs(framework("Data Analysis", "HR", &[1, 2, 3]), two_round_courses()),
            CancellationToken::new(),
        )
        .await
        .unwrap();
    let report = outcome.report().unwrap();

    assert_eq!(report.artifacts.len(), 6);
    assert_eq!(dirs.artifact_files().len(), 8, "final artifacts plus r1_valid/r1_invalid");
    assert!(dirs.checkpoint_files().is_empty());

    let names: Vec<String> = dirs
        .artifact_files()
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    for artifact in [
        "r1_valid",
        "r1_invalid",
        "valid_skills",
        "invalid_skills",
        "all_tagged_skills",
        "out_of_sector_skills",
        "missing_content_courses",
        "poor_quality_courses",
    ] {
        let prefix = format!("hr_{}_{}", artifact, report.run_id);
        assert!(
            names.iter().any(|n| n.starts_with(&prefix)),
            "missing artifact {} in {:?}",
            artifact,
            names
        );
    }

    let valid_path = report
        .artifacts
        .iter()
        .find(|p| p.to_string_lossy().contains("_valid_skills_"))
        .unwrap();
    let rows = read_artifact(valid_path);
    let levels: Vec<&str> = rows.iter().map(|r| r["proficiency_level"].as_str()).collect();
    assert_eq!(levels, vec!["2", "3"]);
    assert_eq!(rows[1]["source_round"], "r2");
    assert_eq!(rows[0]["Sector Relevance"], "In Sector");

    let all_path = report
        .artifacts
        .iter()
        .find(|p| p.to_string_lossy().contains("_all_tagged_skills_"))
        .unwrap();
    assert_eq!(read_artifact(all_path).len(), 3);
}

#[tokio::test]
async fn test_every_record_lands_once_and_valid_levels_exist() {
    let dirs = TestDirs::new();
    let orchestrator = orchestrator(
        Arc::new(StubClassifier::new()),
        &dirs,
        fast_settings(),
        EventBus::new(1024),
    );

    let outcome = orchestrator
        .execute(
            inputs(framework("Data Analysis", "HR", &[2, 3, 4]), courses(40, "Data Analysis")),
            CancellationToken::new(),
        )
        .await
        .unwrap();
    let report = outcome.report().unwrap();

    assert_eq!(report.valid.len() + report.invalid.len(), 40);
    let keys: HashSet<(String, String)> = report
        .all_tagged()
        .iter()
        .map(|r| (r.course_ref_id.clone(), r.skill_title.clone()))
        .collect();
    assert_eq!(keys.len(), 40);

    let allowed = [2u8, 3, 4];
    assert!(report
        .valid
        .iter()
        .all(|r| allowed.contains(&r.proficiency_level)));
    assert!(report
        .invalid
        .iter()
        .all(|r| r.proficiency_level == 0 || !allowed.contains(&r.proficiency_level)));
}

#[tokio::test]
async fn test_failed_call_is_recorded_as_unresolved() {
    let dirs = TestDirs::new();
    let classifier = Arc::new(ScriptedClassifier::new(|req| {
        if title_of(req) == "Course C1" {
            Err(ClassifyError::Api(500, "upstream exploded".to_string()))
        } else {
            Ok(2)
        }
    }));
    let orchestrator = orchestrator(
        classifier.clone(),
        &dirs,
        fast_settings(),
        EventBus::new(1024),
    );

    let outcome = orchestrator
        .execute(
            inputs(
                framework("Data Analysis", "HR", &[1, 2, 3]),
                vec![course_row("C1", "Data Analysis"), course_row("C2", "Data Analysis")],
            ),
            CancellationToken::new(),
        )
        .await
        .unwrap();
    let report = outcome.report().unwrap();

    assert_eq!(report.valid.len(), 1);
    assert_eq!(report.invalid.len(), 1);
    let failed = &report.invalid[0];
    assert_eq!(failed.course_ref_id, "C1");
    assert_eq!(failed.proficiency_level, 0);
    assert_eq!(failed.reason, "");
    assert_eq!(failed.confidence, None);
    assert_eq!(report.statistics.classification_failures, 2);
    assert_eq!(classifier.call_count(), 3);
}

#[tokio::test]
async fn test_progress_events_are_monotonic_per_round() {
    let dirs = TestDirs::new();
    let event_bus = EventBus::new(4096);
    let mut rx = event_bus.subscribe();
    let orchestrator = orchestrator(
        Arc::new(StubClassifier::new()),
        &dirs,
        fast_settings(),
        event_bus,
    );

    orchestrator
        .execute(
            inputs(framework("Data Analysis", "HR", &[2, 3]), courses(25, "Data Analysis")),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    let events = drain(&mut rx);
    assert!(matches!(events.first(), Some(TaggingEvent::CheckpointSaved { .. })));
    assert!(matches!(events.last(), Some(TaggingEvent::RunCompleted { .. })));
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, TaggingEvent::RunStarted { resumed: false, .. }))
            .count(),
        1
    );

    let reconciled: Vec<u8> = events
        .iter()
        .filter_map(|e| match e {
            TaggingEvent::RoundReconciled { round, .. } => Some(*round),
            _ => None,
        })
        .collect();
    assert_eq!(reconciled, vec![1, 2]);

    let mut last: Option<(u8, f64)> = None;
    for event in &events {
        if let TaggingEvent::Progress {
            round, fraction, ..
        } = event
        {
            if let Some((last_round, last_fraction)) = last {
                if last_round == *round {
                    assert!(*fraction >= last_fraction);
                }
            }
            last = Some((*round, *fraction));
        }
    }
    // One update per wave: 10 + 10 + 5
    let r1_progress: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            TaggingEvent::Progress {
                round: 1,
                processed,
                ..
            } => Some(*processed),
            _ => None,
        })
        .collect();
    assert_eq!(r1_progress, vec![10, 20, 25]);
}

#[tokio::test]
async fn test_unknown_sector_is_validation_error() {
    let dirs = TestDirs::new();
    let event_bus = EventBus::new(64);
    let mut rx = event_bus.subscribe();
    let classifier = Arc::new(ScriptedClassifier::fixed(2));
    let orchestrator = orchestrator(classifier.clone(), &dirs, fast_settings(), event_bus);

    let mut run_inputs = inputs(framework("Data Analysis", "HR", &[1, 2]), courses(3, "Data Analysis"));
    run_inputs.sectors = vec!["Finance".to_string()];

    let err = orchestrator
        .execute(run_inputs, CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Validation(_)));
    assert_eq!(classifier.call_count(), 0);
    assert!(drain(&mut rx)
        .iter()
        .any(|e| matches!(e, TaggingEvent::RunFailed { .. })));
}

#[tokio::test]
async fn test_all_valid_in_round_one_skips_round_two_calls() {
    let dirs = TestDirs::new();
    let classifier = Arc::new(ScriptedClassifier::fixed(2));
    let handle = Arc::new(RwLock::new(None));
    let orchestrator = orchestrator(
        classifier.clone(),
        &dirs,
        fast_settings(),
        EventBus::new(1024),
    )
    .with_session_handle(handle.clone());

    let outcome = orchestrator
        .execute(
            inputs(framework("Data Analysis", "HR", &[1, 2, 3]), courses(12, "Data Analysis")),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(outcome.is_completed());
    let report = outcome.report().unwrap();
    assert_eq!(report.valid.len(), 12);
    assert!(report.invalid.is_empty());
    assert!(report.valid.iter().all(|r| r.source_round == Round::R1));
    assert!(classifier.calls_in(Round::R2).is_empty());

    let session = handle.read().await.clone().unwrap();
    assert_eq!(session.state, PipelineState::Complete);
    assert_eq!(session.run_id, report.run_id);
    assert!(!session.resumed);
    assert!(session.ended_at.is_some());
    assert_eq!(session.progress.round, Some(Round::R2));
    assert_eq!(session.progress.percentage, 100.0);

    assert!(matches!(outcome, RunOutcome::Completed(_)));
}
