use super::*;

/// Drive a diagnosing job to quality_check
fn to_quality_check(manager: &JobsManager, job_id: i64, tech: &Actor) {
    advance(
        manager,
        job_id,
        tech,
        &[JobStatus::Repairing, JobStatus::QualityCheck],
    );
}

#[test]
fn test_checklist_seeded_on_diagnosing() {
    let manager = create_test_manager();
    let (job, _tech) = diagnosing_job(&manager);

    assert_eq!(
        job.checklist,
        vec![ChecklistItem::new(1, "Inspect"), ChecklistItem::new(2, "Repair")]
    );
}

#[test]
fn test_offer_checklist_overrides_default() {
    let manager = create_test_manager();
    let tech = technician("tech-a");
    let ticket = manager.create_ticket(&customer("cust-1"), new_ticket()).unwrap();
    let job = manager
        .offer_job(
            &operator(),
            ticket.id,
            NewOffer {
                candidates: vec![],
                checklist: Some(vec!["Replace belt".to_string()]),
            },
        )
        .unwrap();
    manager.claim(job.id, &tech).unwrap();
    let job = advance(
        &manager,
        job.id,
        &tech,
        &[JobStatus::EnRoute, JobStatus::Arrived, JobStatus::Diagnosing],
    );

    assert_eq!(job.checklist.len(), 1);
    assert_eq!(job.checklist[0].name, "Replace belt");
}

#[test]
fn test_complete_item_is_idempotent() {
    let manager = create_test_manager();
    let (job, tech) = diagnosing_job(&manager);
    let events_before = timeline(&manager, job.id).len();

    let first = manager.complete_checklist_item(job.id, 1, &tech).unwrap();
    let completed_at = first.checklist_item(1).unwrap().completed_at;
    assert!(completed_at.is_some());

    let second = manager.complete_checklist_item(job.id, 1, &tech).unwrap();
    assert_eq!(second.checklist_item(1).unwrap().completed_at, completed_at);

    let events = timeline(&manager, job.id);
    assert_eq!(events.len(), events_before + 1);
    assert_eq!(
        events.last().unwrap().kind,
        TimelineKind::ChecklistItemCompleted { item_id: 1 }
    );
}

#[test]
fn test_complete_item_errors() {
    let manager = create_test_manager();
    let (job, _tech) = diagnosing_job(&manager);

    assert!(matches!(
        manager.complete_checklist_item(job.id, 42, &technician("tech-a")),
        Err(ManagerError::ChecklistItemNotFound { item_id: 42, .. })
    ));
    assert!(matches!(
        manager.complete_checklist_item(job.id, 1, &technician("tech-b")),
        Err(ManagerError::Unauthorized(_))
    ));
    assert!(matches!(
        manager.complete_checklist_item(job.id, 1, &customer("cust-1")),
        Err(ManagerError::Unauthorized(_))
    ));
    assert!(matches!(
        manager.complete_checklist_item(999, 1, &operator()),
        Err(ManagerError::JobNotFound(999))
    ));
}

#[test]
fn test_completion_blocked_by_open_items() {
    let manager = create_test_manager();
    let (job, tech) = diagnosing_job(&manager);
    manager.complete_checklist_item(job.id, 1, &tech).unwrap();
    to_quality_check(&manager, job.id, &tech);

    let before = timeline(&manager, job.id).len();
    let result = manager.transition(job.id, JobStatus::Completed, &tech, None);
    assert!(matches!(result, Err(ManagerError::ChecklistIncomplete(ref open)) if open == &vec![2]));
    assert_eq!(timeline(&manager, job.id).len(), before);
    assert_eq!(
        manager.get_job(job.id).unwrap().status,
        JobStatus::QualityCheck
    );

    manager.complete_checklist_item(job.id, 2, &tech).unwrap();
    let done = manager
        .transition(job.id, JobStatus::Completed, &tech, None)
        .unwrap();
    assert_eq!(done.status, JobStatus::Completed);
}

#[test]
fn test_waived_item_settles_checklist() {
    let manager = create_test_manager();
    let (job, tech) = diagnosing_job(&manager);
    manager.complete_checklist_item(job.id, 1, &tech).unwrap();
    to_quality_check(&manager, job.id, &tech);

    assert!(matches!(
        manager.waive_checklist_item(job.id, 2, "Not applicable".to_string(), &tech),
        Err(ManagerError::Unauthorized(_))
    ));
    assert!(matches!(
        manager.waive_checklist_item(job.id, 2, " ".to_string(), &operator()),
        Err(ManagerError::Invalid(_))
    ));

    let waived = manager
        .waive_checklist_item(job.id, 2, "Not applicable".to_string(), &operator())
        .unwrap();
    let item = waived.checklist_item(2).unwrap();
    assert!(item.waived);
    assert!(!item.completed);
    assert_eq!(item.waive_reason.as_deref(), Some("Not applicable"));

    let events = timeline(&manager, job.id).len();
    manager
        .waive_checklist_item(job.id, 2, "Again".to_string(), &operator())
        .unwrap();
    assert_eq!(timeline(&manager, job.id).len(), events);

    let done = manager
        .transition(job.id, JobStatus::Completed, &tech, None)
        .unwrap();
    assert_eq!(done.status, JobStatus::Completed);
}

#[test]
fn test_closed_job_checklist_is_frozen() {
    let manager = create_test_manager();
    let (job, _tech) = diagnosing_job(&manager);
    manager
        .transition(job.id, JobStatus::Cancelled, &operator(), None)
        .unwrap();

    assert!(matches!(
        manager.complete_checklist_item(job.id, 1, &operator()),
        Err(ManagerError::Invalid(_))
    ));
    assert!(matches!(
        manager.waive_checklist_item(job.id, 1, "n/a".to_string(), &operator()),
        Err(ManagerError::Invalid(_))
    ));
}

#[tokio::test]
async fn test_checklist_completion_broadcasts_once() {
    let manager = create_test_manager();
    let (job, tech) = diagnosing_job(&manager);
    let mut rx = manager.subscribe();

    manager.complete_checklist_item(job.id, 1, &tech).unwrap();
    manager.complete_checklist_item(job.id, 1, &tech).unwrap();

    let event = rx.recv().await.unwrap();
    assert!(matches!(
        event,
        DomainEvent::ChecklistItemCompleted { item_id: 1, .. }
    ));
    assert!(rx.try_recv().is_err());
}
