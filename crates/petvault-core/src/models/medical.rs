//! Medical resource metadata.
//!
//! Payloads (diagnosis text, dosage, ...) live in the CRUD layer. This
//! core only reads which pet a record belongs to and who authored it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::actor::Role;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    MedicalRecord,
    Prescription,
    LabTest,
    Allergy,
    Vaccination,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::MedicalRecord,
        ResourceKind::Prescription,
        ResourceKind::LabTest,
        ResourceKind::Allergy,
        ResourceKind::Vaccination,
    ];

    /// Kinds only a veterinary professional may author.
    pub fn requires_professional_authorship(self) -> bool {
        matches!(
            self,
            ResourceKind::Prescription | ResourceKind::LabTest | ResourceKind::Vaccination
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Action {
    Read,
    Create,
    Update,
}

impl Action {
    pub const ALL: [Action; 3] = [Action::Read, Action::Create, Action::Update];
}

/// Audit metadata stamped on every medical resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceProvenance {
    pub pet_id: Uuid,
    pub kind: ResourceKind,
    pub created_by_user_id: Uuid,
    pub created_by_role: Role,
    /// Clinic the author acted for, when authored by a professional.
    pub clinic_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_by_user_id: Option<Uuid>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ResourceProvenance {
    pub fn is_authored_by(&self, user_id: Uuid) -> bool {
        self.created_by_user_id == user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn professional_authorship_kinds() {
        let professional: Vec<_> = ResourceKind::ALL
            .into_iter()
            .filter(|k| k.requires_professional_authorship())
            .collect();
        assert_eq!(
            professional,
            vec![
                ResourceKind::Prescription,
                ResourceKind::LabTest,
                ResourceKind::Vaccination
            ]
        );
    }

    #[test]
    fn provenance_serializes_role_by_name() {
        let provenance = ResourceProvenance {
            pet_id: Uuid::new_v4(),
            kind: ResourceKind::Allergy,
            created_by_user_id: Uuid::new_v4(),
            created_by_role: Role::FamilyMember,
            clinic_id: None,
            created_at: Utc::now(),
            updated_by_user_id: None,
            updated_at: None,
        };
        let json = serde_json::to_value(&provenance).unwrap();
        assert_eq!(json["created_by_role"], "FamilyMember");
        assert_eq!(json["kind"], "Allergy");
    }
}
