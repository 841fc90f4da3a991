//! End-to-end pipeline tests against a live database.
//!
//! The chain is built from the deterministic tiers (heuristic + stub)
//! so no extraction backend needs to be running:
//! `cargo test -p vitae-jobs -- --ignored`

use std::sync::Arc;

use vitae_core::{
    CreateJobDescriptionRequest, CreateResumeRequest, Error, EventBus, ProcessingStatus,
    QueueStatus, RunStatus, RunType, TenantContext,
};
use vitae_db::test_fixtures::{connect_test_db, scratch_partition};
use vitae_db::{Database, EnqueueRequest};
use vitae_extract::{
    EnhancementStage, ExtractionChain, ExtractionProvider, HeuristicProvider,
    KeywordOverlapEnhancer, StubProvider,
};
use vitae_jobs::{CompletionNotifier, ProcessingPipeline, Reaper, ReaperConfig};

const SAMPLE_TEXT: &str = "Jane Doe\njane.doe@example.com | (555) 123-4567\n\
    Senior Software Engineer at Acme\nSkills include Rust, PostgreSQL, Docker\n\
    Bachelor of Science, State University, 2015\n";

fn deterministic_chain() -> ExtractionChain {
    let providers: Vec<Arc<dyn ExtractionProvider>> =
        vec![Arc::new(HeuristicProvider), Arc::new(StubProvider)];
    ExtractionChain::new(providers)
}

fn pipeline_with(db: &Database, bus: &EventBus, stage: EnhancementStage) -> ProcessingPipeline {
    ProcessingPipeline::new(
        db.clone(),
        deterministic_chain(),
        stage,
        CompletionNotifier::new(bus.clone()),
    )
}

async fn provisioned_context(db: &Database) -> TenantContext {
    let partition = scratch_partition();
    db.tenants()
        .create_partition(&partition)
        .await
        .expect("partition DDL");
    TenantContext::new(partition).unwrap()
}

async fn seeded_resume(db: &Database, ctx: &TenantContext, raw_text: Option<&str>) -> uuid::Uuid {
    db.resumes()
        .create(
            ctx,
            CreateResumeRequest {
                user_id: Some(uuid::Uuid::new_v4()),
                title: "Jane Doe Resume".into(),
                file_ref: format!("/nonexistent/{}.pdf", uuid::Uuid::new_v4()),
                raw_text: raw_text.map(String::from),
            },
        )
        .await
        .unwrap()
}

async fn claimed_entry(db: &Database, req: EnqueueRequest) -> vitae_core::QueueEntry {
    db.queue().enqueue(req).await.unwrap().unwrap();
    db.queue().claim_next().await.unwrap().unwrap()
}

#[tokio::test]
#[ignore = "requires a PostgreSQL instance"]
async fn pipeline_completes_with_deterministic_tiers() {
    let db = connect_test_db().await;
    let ctx = provisioned_context(&db).await;
    let resume_id = seeded_resume(&db, &ctx, Some(SAMPLE_TEXT)).await;

    let bus = EventBus::new();
    let mut events = bus.subscribe();
    let pipeline = pipeline_with(
        &db,
        &bus,
        EnhancementStage::new(vec![Arc::new(KeywordOverlapEnhancer)]),
    );

    let entry = claimed_entry(
        &db,
        EnqueueRequest {
            resume_id,
            job_description_id: None,
            provider_preference: None,
            partition_key: ctx.partition().to_string(),
        },
    )
    .await;

    pipeline.process(&entry).await.unwrap();

    let resume = db.resumes().get(&ctx, resume_id).await.unwrap().unwrap();
    assert_eq!(resume.processing_status, ProcessingStatus::Completed);
    assert_eq!(resume.provider_used.as_deref(), Some("heuristic"));
    assert_eq!(resume.extracted_email.as_deref(), Some("jane.doe@example.com"));
    assert!(resume.extraction_confidence.is_some());
    assert!(resume.extracted_name.is_some());

    // Completion notification reached the user-scoped channel.
    let event = events.try_recv().unwrap();
    assert_eq!(event.resume_id, resume_id);
    assert_eq!(event.status, "completed");

    // The extraction run is on record.
    let runs = db.runs().list_for_resume(&ctx, resume_id).await.unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].run_type, RunType::Extraction);
    assert_eq!(runs[0].status, RunStatus::Completed);
}

#[tokio::test]
#[ignore = "requires a PostgreSQL instance"]
async fn resume_without_text_still_completes_at_stub_tier() {
    let db = connect_test_db().await;
    let ctx = provisioned_context(&db).await;
    let resume_id = seeded_resume(&db, &ctx, None).await;

    let bus = EventBus::new();
    let pipeline = pipeline_with(&db, &bus, EnhancementStage::new(vec![]));

    let entry = claimed_entry(
        &db,
        EnqueueRequest {
            resume_id,
            job_description_id: None,
            provider_preference: None,
            partition_key: ctx.partition().to_string(),
        },
    )
    .await;

    pipeline.process(&entry).await.unwrap();

    let resume = db.resumes().get(&ctx, resume_id).await.unwrap().unwrap();
    assert_eq!(resume.processing_status, ProcessingStatus::Completed);
    assert_eq!(resume.provider_used.as_deref(), Some("stub"));
    // Minimal tier, never null on success.
    assert!(resume.extraction_confidence.unwrap() <= 0.1 + f32::EPSILON);
    assert!(resume.extracted_name.is_some());
}

#[tokio::test]
#[ignore = "requires a PostgreSQL instance"]
async fn enhancement_failure_never_blocks_completion() {
    let db = connect_test_db().await;
    let ctx = provisioned_context(&db).await;
    let resume_id = seeded_resume(&db, &ctx, Some(SAMPLE_TEXT)).await;

    let jd_id = db
        .job_descriptions()
        .create(
            &ctx,
            CreateJobDescriptionRequest {
                user_id: None,
                title: "Backend Engineer".into(),
                company: Some("Acme".into()),
                content: "Rust and PostgreSQL in production".into(),
            },
        )
        .await
        .unwrap();

    let bus = EventBus::new();
    // Empty stage: every enhancement provider "fails".
    let pipeline = pipeline_with(&db, &bus, EnhancementStage::new(vec![]));

    let entry = claimed_entry(
        &db,
        EnqueueRequest {
            resume_id,
            job_description_id: Some(jd_id),
            provider_preference: None,
            partition_key: ctx.partition().to_string(),
        },
    )
    .await;

    pipeline.process(&entry).await.unwrap();

    // The resume still reached completed.
    let resume = db.resumes().get(&ctx, resume_id).await.unwrap().unwrap();
    assert_eq!(resume.processing_status, ProcessingStatus::Completed);

    // The enhancement run is independently marked failed.
    let runs = db.runs().list_for_resume(&ctx, resume_id).await.unwrap();
    let enhancement_run = runs
        .iter()
        .find(|r| r.run_type == RunType::Enhancement)
        .expect("enhancement run recorded");
    assert_eq!(enhancement_run.status, RunStatus::Failed);

    // No enhancement row was persisted.
    assert!(db
        .enhancements()
        .get(&ctx, resume_id, jd_id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
#[ignore = "requires a PostgreSQL instance"]
async fn enhancement_success_persists_upsert_and_score() {
    let db = connect_test_db().await;
    let ctx = provisioned_context(&db).await;
    let resume_id = seeded_resume(&db, &ctx, Some(SAMPLE_TEXT)).await;

    let jd_id = db
        .job_descriptions()
        .create(
            &ctx,
            CreateJobDescriptionRequest {
                user_id: None,
                title: "Backend Engineer".into(),
                company: None,
                content: "Rust PostgreSQL Docker".into(),
            },
        )
        .await
        .unwrap();

    let bus = EventBus::new();
    let pipeline = pipeline_with(
        &db,
        &bus,
        EnhancementStage::new(vec![Arc::new(KeywordOverlapEnhancer)]),
    );

    let entry = claimed_entry(
        &db,
        EnqueueRequest {
            resume_id,
            job_description_id: Some(jd_id),
            provider_preference: None,
            partition_key: ctx.partition().to_string(),
        },
    )
    .await;

    pipeline.process(&entry).await.unwrap();

    let enhancement = db
        .enhancements()
        .get(&ctx, resume_id, jd_id)
        .await
        .unwrap()
        .expect("enhancement persisted");
    assert!(enhancement.match_score.unwrap() > 0.0);
    assert_eq!(enhancement.provider_used.as_deref(), Some("keyword-overlap"));
}

#[tokio::test]
#[ignore = "requires a PostgreSQL instance"]
async fn missing_resume_is_fatal_and_non_retryable() {
    let db = connect_test_db().await;
    let ctx = provisioned_context(&db).await;

    let bus = EventBus::new();
    let pipeline = pipeline_with(&db, &bus, EnhancementStage::new(vec![]));

    let entry = claimed_entry(
        &db,
        EnqueueRequest {
            resume_id: uuid::Uuid::new_v4(),
            job_description_id: None,
            provider_preference: None,
            partition_key: ctx.partition().to_string(),
        },
    )
    .await;

    let err = pipeline.process(&entry).await.unwrap_err();
    assert!(matches!(err, Error::ResumeNotFound(_)));
    assert!(err.is_non_retryable());
}

#[tokio::test]
#[ignore = "requires a PostgreSQL instance"]
async fn reaper_sweep_reclaims_stuck_work_across_partitions() {
    let db = connect_test_db().await;
    let ctx = provisioned_context(&db).await;
    let resume_id = seeded_resume(&db, &ctx, Some(SAMPLE_TEXT)).await;

    // Simulate a worker that died mid-flight ten minutes ago.
    db.resumes()
        .mark_processing(
            &ctx,
            resume_id,
            chrono::Utc::now() - chrono::Duration::minutes(10),
        )
        .await
        .unwrap();

    let entry_id = db
        .queue()
        .enqueue(EnqueueRequest {
            resume_id,
            job_description_id: None,
            provider_preference: None,
            partition_key: ctx.partition().to_string(),
        })
        .await
        .unwrap()
        .unwrap();
    db.queue().claim_next().await.unwrap().unwrap();
    sqlx::query("UPDATE processing_queue SET started_at = now() - interval '10 minutes' WHERE id = $1")
        .bind(entry_id)
        .execute(&db.pool)
        .await
        .unwrap();

    // The scratch partition is not registered as a tenant, so sweep it
    // by registering it through the tenant table is out of scope here;
    // sweep directly via the repository plus the shared queue pass.
    let reaper = Reaper::new(db.clone(), ReaperConfig::default().with_sla(180));
    let report = reaper.sweep().await;
    assert!(report.queue_entries_reset >= 1);

    let cutoff = chrono::Utc::now() - chrono::Duration::seconds(180);
    let count = db
        .resumes()
        .reset_stuck(&ctx, cutoff, "Processing timeout - reset for retry")
        .await
        .unwrap();
    assert_eq!(count, 1);

    let entry = db.queue().get(entry_id).await.unwrap().unwrap();
    assert_eq!(entry.status, QueueStatus::Pending);

    let resume = db.resumes().get(&ctx, resume_id).await.unwrap().unwrap();
    assert_eq!(resume.processing_status, ProcessingStatus::Pending);
}
