use super::*;
use shared::job::{ChecklistItem, TimelineEvent};

fn test_config() -> DispatchConfig {
    DispatchConfig {
        offer_ttl_ms: 900_000,
        offer_sweep_interval_ms: 30_000,
        default_checklist: vec!["Inspect".to_string(), "Repair".to_string()],
    }
}

fn create_test_manager() -> JobsManager {
    create_manager_with(test_config())
}

fn create_manager_with(config: DispatchConfig) -> JobsManager {
    let storage = JobStorage::open_in_memory().unwrap();
    JobsManager::with_storage(storage, config)
}

fn customer(id: &str) -> Actor {
    Actor::new(id, format!("Customer {}", id), Role::Customer)
}

fn technician(id: &str) -> Actor {
    Actor::new(id, format!("Tech {}", id), Role::Technician).with_phone("+63 917 000 0001")
}

fn operator() -> Actor {
    Actor::new("op-1", "Dispatcher", Role::Operator)
}

fn new_ticket() -> NewTicket {
    NewTicket {
        contact: CustomerContact {
            name: "Ana Cruz".to_string(),
            phone: "+63 900 000 0000".to_string(),
            email: Some("ana@example.com".to_string()),
        },
        device: DeviceDescriptor {
            device_type: "washing machine".to_string(),
            brand: "Spinwell".to_string(),
            model: Some("SW-9".to_string()),
        },
        issue: "Drum does not spin".to_string(),
        address: "12 Mabini St, Quezon City".to_string(),
        address_resolved: true,
        coordinates: Some(Coordinates::new(14.6760, 121.0437)),
        preferred_date: Some("2026-10-20".to_string()),
        preferred_time: Some("morning".to_string()),
    }
}

/// Ticket + open offer
fn offered_job(manager: &JobsManager) -> Job {
    let ticket = manager.create_ticket(&customer("cust-1"), new_ticket()).unwrap();
    manager
        .offer_job(&operator(), ticket.id, NewOffer::default())
        .unwrap()
}

/// Walk a claimed job forward along the main progression
fn advance(manager: &JobsManager, job_id: i64, tech: &Actor, path: &[JobStatus]) -> Job {
    let mut job = manager.get_job(job_id).unwrap();
    for status in path {
        job = manager.transition(job_id, *status, tech, None).unwrap();
    }
    job
}

/// Job claimed by `tech-a` and moved into diagnosing (checklist seeded)
fn diagnosing_job(manager: &JobsManager) -> (Job, Actor) {
    let tech = technician("tech-a");
    let job = offered_job(manager);
    manager.claim(job.id, &tech).unwrap();
    let job = advance(
        manager,
        job.id,
        &tech,
        &[JobStatus::EnRoute, JobStatus::Arrived, JobStatus::Diagnosing],
    );
    (job, tech)
}

fn timeline(manager: &JobsManager, job_id: i64) -> Vec<TimelineEvent> {
    manager.get_job_with_timeline(job_id).unwrap().1
}

fn position(lat: f64, lng: f64, captured_at: i64) -> TechnicianPosition {
    TechnicianPosition {
        lat,
        lng,
        captured_at,
    }
}

mod test_checklist;
mod test_claims;
