use super::*;
use std::sync::Arc;

#[test]
fn test_create_ticket_starts_in_triage() {
    let manager = create_test_manager();
    let ticket = manager.create_ticket(&customer("cust-1"), new_ticket()).unwrap();

    assert_eq!(ticket.status, TicketStatus::PendingTriage);
    assert!(ticket.current_job_id.is_none());
    assert_eq!(ticket.customer_id, "cust-1");

    let triage = manager.list_triage().unwrap();
    assert_eq!(triage.len(), 1);
    assert_eq!(triage[0].id, ticket.id);
}

#[test]
fn test_create_ticket_requires_customer_and_issue() {
    let manager = create_test_manager();
    assert!(matches!(
        manager.create_ticket(&operator(), new_ticket()),
        Err(ManagerError::Unauthorized(_))
    ));

    let mut draft = new_ticket();
    draft.issue = "   ".to_string();
    assert!(matches!(
        manager.create_ticket(&customer("cust-1"), draft),
        Err(ManagerError::Invalid(_))
    ));
}

#[test]
fn test_customer_tickets_newest_first() {
    let manager = create_test_manager();
    let first = manager.create_ticket(&customer("cust-1"), new_ticket()).unwrap();
    let second = manager.create_ticket(&customer("cust-1"), new_ticket()).unwrap();
    manager.create_ticket(&customer("cust-2"), new_ticket()).unwrap();

    let tickets = manager.list_customer_tickets("cust-1").unwrap();
    let ids: Vec<i64> = tickets.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);
}

#[test]
fn test_offer_job_links_ticket() {
    let manager = create_test_manager();
    let job = offered_job(&manager);

    assert_eq!(job.status, JobStatus::Offered);
    assert!(job.technician.is_none());
    assert_eq!(job.checklist_template, vec!["Inspect", "Repair"]);
    assert!(job.checklist.is_empty());

    let ticket = manager.get_ticket(job.ticket_id).unwrap();
    assert_eq!(ticket.current_job_id, Some(job.id));
    assert_eq!(ticket.status, TicketStatus::Job(JobStatus::Offered));
    assert!(manager.list_triage().unwrap().is_empty());

    let events = timeline(&manager, job.id);
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0].kind,
        TimelineKind::StatusChanged {
            from: None,
            to: JobStatus::Offered
        }
    );
}

#[test]
fn test_offer_job_rejects_second_live_job() {
    let manager = create_test_manager();
    let job = offered_job(&manager);

    let result = manager.offer_job(&operator(), job.ticket_id, NewOffer::default());
    assert!(matches!(
        result,
        Err(ManagerError::TicketHasActiveJob { ticket_id, job_id })
            if ticket_id == job.ticket_id && job_id == job.id
    ));

    // once the first job is rejected the ticket may be offered again
    manager.reject(job.id, &operator(), None).unwrap();
    let ticket = manager.get_ticket(job.ticket_id).unwrap();
    assert_eq!(ticket.status, TicketStatus::PendingTriage);

    let second = manager
        .offer_job(&operator(), job.ticket_id, NewOffer::default())
        .unwrap();
    assert_ne!(second.id, job.id);
}

#[test]
fn test_offer_job_operator_only() {
    let manager = create_test_manager();
    let ticket = manager.create_ticket(&customer("cust-1"), new_ticket()).unwrap();
    assert!(matches!(
        manager.offer_job(&technician("tech-a"), ticket.id, NewOffer::default()),
        Err(ManagerError::Unauthorized(_))
    ));
    assert!(matches!(
        manager.offer_job(&operator(), 999, NewOffer::default()),
        Err(ManagerError::TicketNotFound(999))
    ));
}

#[test]
fn test_claim_binds_technician() {
    let manager = create_test_manager();
    let job = offered_job(&manager);
    let tech = technician("tech-a");

    let claimed = manager.claim(job.id, &tech).unwrap();
    assert_eq!(claimed.status, JobStatus::Accepted);
    assert!(claimed.is_assigned_to("tech-a"));
    assert_eq!(
        claimed.technician.as_ref().and_then(|t| t.phone.as_deref()),
        Some("+63 917 000 0001")
    );

    let assigned = manager.get_assigned_jobs("tech-a").unwrap();
    assert_eq!(assigned.len(), 1);
    assert!(manager.get_offered_jobs("tech-b").unwrap().is_empty());
    assert!(manager.storage().get_offered().unwrap().is_empty());
}

#[test]
fn test_second_claim_is_already_claimed() {
    let manager = create_test_manager();
    let job = offered_job(&manager);

    manager.claim(job.id, &technician("tech-a")).unwrap();
    let result = manager.claim(job.id, &technician("tech-b"));
    assert!(matches!(result, Err(ManagerError::AlreadyClaimed(id)) if id == job.id));

    // the winner re-claiming is an illegal edge, not a lost race
    let result = manager.claim(job.id, &technician("tech-a"));
    assert!(matches!(result, Err(ManagerError::IllegalTransition { .. })));

    assert_eq!(timeline(&manager, job.id).len(), 2);
}

#[test]
fn test_concurrent_claims_have_single_winner() {
    let manager = Arc::new(create_test_manager());
    let job = offered_job(&manager);

    let results: Vec<ManagerResult<Job>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let manager = Arc::clone(&manager);
                scope.spawn(move || manager.claim(job.id, &technician(&format!("tech-{}", i))))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let winners: Vec<&Job> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1);
    let losers = results
        .iter()
        .filter(|r| matches!(r, Err(ManagerError::AlreadyClaimed(_))))
        .count();
    assert_eq!(losers, 7);

    let stored = manager.get_job(job.id).unwrap();
    assert_eq!(stored.technician, winners[0].technician);

    let accepted_events = timeline(&manager, job.id)
        .into_iter()
        .filter(|e| e.status == JobStatus::Accepted)
        .count();
    assert_eq!(accepted_events, 1);
}

#[test]
fn test_claim_restricted_to_candidates() {
    let manager = create_test_manager();
    let ticket = manager.create_ticket(&customer("cust-1"), new_ticket()).unwrap();
    let job = manager
        .offer_job(
            &operator(),
            ticket.id,
            NewOffer {
                candidates: vec!["tech-a".to_string()],
                checklist: None,
            },
        )
        .unwrap();

    assert!(matches!(
        manager.claim(job.id, &technician("tech-b")),
        Err(ManagerError::NotACandidate(_))
    ));
    assert!(manager.get_offered_jobs("tech-b").unwrap().is_empty());
    assert_eq!(manager.get_offered_jobs("tech-a").unwrap().len(), 1);
    assert!(manager.claim(job.id, &technician("tech-a")).is_ok());
}

#[test]
fn test_customer_and_operator_cannot_claim() {
    let manager = create_test_manager();
    let job = offered_job(&manager);

    assert!(matches!(
        manager.claim(job.id, &customer("cust-1")),
        Err(ManagerError::Unauthorized(_))
    ));
    assert!(matches!(
        manager.claim(job.id, &operator()),
        Err(ManagerError::Unauthorized(_))
    ));
    assert_eq!(manager.get_job(job.id).unwrap().status, JobStatus::Offered);
}

#[test]
fn test_operator_assign() {
    let manager = create_test_manager();
    let job = offered_job(&manager);
    let tech = technician("tech-c").to_technician_ref();

    assert!(matches!(
        manager.assign(job.id, tech.clone(), &technician("tech-c")),
        Err(ManagerError::Unauthorized(_))
    ));

    let assigned = manager.assign(job.id, tech, &operator()).unwrap();
    assert_eq!(assigned.status, JobStatus::Accepted);
    assert!(assigned.is_assigned_to("tech-c"));

    let last = timeline(&manager, job.id).pop().unwrap();
    assert_eq!(last.actor.role, Role::Operator);
}

#[test]
fn test_expired_offer_cannot_be_claimed() {
    let manager = create_manager_with(DispatchConfig {
        offer_ttl_ms: 0,
        ..test_config()
    });
    let job = offered_job(&manager);

    assert!(matches!(
        manager.claim(job.id, &technician("tech-a")),
        Err(ManagerError::OfferExpired(_))
    ));
    assert!(manager.get_offered_jobs("tech-a").unwrap().is_empty());
}

#[test]
fn test_expire_offers_sweeps_stale_offers() {
    let manager = create_test_manager();
    let stale = offered_job(&manager);

    let other = manager.create_ticket(&customer("cust-2"), new_ticket()).unwrap();
    let claimed = manager
        .offer_job(&operator(), other.id, NewOffer::default())
        .unwrap();
    manager.claim(claimed.id, &technician("tech-a")).unwrap();

    assert!(manager.expire_offers(now_millis()).unwrap().is_empty());

    let later = stale.offer_expires_at + 1;
    assert_eq!(manager.expire_offers(later).unwrap(), vec![stale.id]);

    let job = manager.get_job(stale.id).unwrap();
    assert_eq!(job.status, JobStatus::Expired);
    let ticket = manager.get_ticket(stale.ticket_id).unwrap();
    assert_eq!(ticket.status, TicketStatus::PendingTriage);

    let last = timeline(&manager, stale.id).pop().unwrap();
    assert_eq!(last.actor.id, "system");

    // idempotent
    assert!(manager.expire_offers(later).unwrap().is_empty());
    assert_eq!(manager.get_job(claimed.id).unwrap().status, JobStatus::Accepted);
}

#[test]
fn test_declines_until_no_candidate_remains() {
    let manager = create_test_manager();
    let ticket = manager.create_ticket(&customer("cust-1"), new_ticket()).unwrap();
    let job = manager
        .offer_job(
            &operator(),
            ticket.id,
            NewOffer {
                candidates: vec!["tech-a".to_string(), "tech-b".to_string()],
                checklist: None,
            },
        )
        .unwrap();

    let after_first = manager
        .reject(job.id, &technician("tech-a"), Some("Too far".to_string()))
        .unwrap();
    assert_eq!(after_first.status, JobStatus::Offered);
    assert_eq!(after_first.declined, vec!["tech-a"]);

    // declining twice changes nothing
    manager.reject(job.id, &technician("tech-a"), None).unwrap();
    assert_eq!(timeline(&manager, job.id).len(), 2);

    assert!(matches!(
        manager.reject(job.id, &technician("tech-z"), None),
        Err(ManagerError::NotACandidate(_))
    ));
    assert!(matches!(
        manager.claim(job.id, &technician("tech-a")),
        Err(ManagerError::NotACandidate(_))
    ));

    let rejected = manager.reject(job.id, &technician("tech-b"), None).unwrap();
    assert_eq!(rejected.status, JobStatus::Rejected);
    assert_eq!(
        manager.get_ticket(ticket.id).unwrap().status,
        TicketStatus::PendingTriage
    );
}

#[test]
fn test_reject_after_claim_is_illegal() {
    let manager = create_test_manager();
    let job = offered_job(&manager);
    manager.claim(job.id, &technician("tech-a")).unwrap();

    assert!(matches!(
        manager.reject(job.id, &technician("tech-a"), None),
        Err(ManagerError::IllegalTransition { .. })
    ));
    assert!(matches!(
        manager.reject(job.id, &operator(), None),
        Err(ManagerError::IllegalTransition { .. })
    ));
    assert!(matches!(
        manager.reject(job.id, &customer("cust-1"), None),
        Err(ManagerError::Unauthorized(_))
    ));
}

#[tokio::test]
async fn test_events_are_broadcast() {
    let manager = create_test_manager();
    let mut rx = manager.subscribe();

    let job = offered_job(&manager);
    manager.claim(job.id, &technician("tech-a")).unwrap();

    let offered = rx.recv().await.unwrap();
    assert!(matches!(
        offered,
        DomainEvent::StatusChanged {
            from: None,
            to: JobStatus::Offered,
            ..
        }
    ));
    let accepted = rx.recv().await.unwrap();
    assert_eq!(accepted.job_id(), job.id);
    assert!(matches!(
        accepted,
        DomainEvent::StatusChanged {
            to: JobStatus::Accepted,
            ..
        }
    ));
}
