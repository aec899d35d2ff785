//! Identity of whoever invokes a job operation

use shared::job::{ActorRef, Role, TechnicianRef};

/// Authenticated caller, as supplied by the identity collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub name: String,
    pub role: Role,
    pub phone: Option<String>,
}

impl Actor {
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role,
            phone: None,
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// Operator identity used by background tasks
    pub fn system() -> Self {
        let system = ActorRef::system();
        Self::new(system.id, system.name, system.role)
    }

    pub fn is_operator(&self) -> bool {
        self.role == Role::Operator
    }

    pub fn is_technician(&self) -> bool {
        self.role == Role::Technician
    }

    pub fn to_ref(&self) -> ActorRef {
        ActorRef {
            id: self.id.clone(),
            name: self.name.clone(),
            role: self.role,
        }
    }

    pub fn to_technician_ref(&self) -> TechnicianRef {
        TechnicianRef {
            id: self.id.clone(),
            name: self.name.clone(),
            phone: self.phone.clone(),
        }
    }
}
