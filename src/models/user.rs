use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Cliente,
    Gerente,
    DirectorTecnico,
    PersonalTecnicoApoyo,
    PersonalAdministrativo,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Cliente => "Cliente",
            Self::Gerente => "Gerente",
            Self::DirectorTecnico => "Director Técnico",
            Self::PersonalTecnicoApoyo => "Personal Técnico de Apoyo",
            Self::PersonalAdministrativo => "Personal Administrativo",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cliente => "cliente",
            Self::Gerente => "gerente",
            Self::DirectorTecnico => "director_tecnico",
            Self::PersonalTecnicoApoyo => "personal_tecnico_apoyo",
            Self::PersonalAdministrativo => "personal_administrativo",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "cliente" => Some(Self::Cliente),
            "gerente" => Some(Self::Gerente),
            "director_tecnico" => Some(Self::DirectorTecnico),
            "personal_tecnico_apoyo" => Some(Self::PersonalTecnicoApoyo),
            "personal_administrativo" => Some(Self::PersonalAdministrativo),
            _ => None,
        }
    }

    pub fn is_internal(&self) -> bool {
        !matches!(self, Self::Cliente)
    }

    pub fn all() -> &'static [Self] {
        &[
            Self::Cliente,
            Self::Gerente,
            Self::DirectorTecnico,
            Self::PersonalTecnicoApoyo,
            Self::PersonalAdministrativo,
        ]
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ViewReport,
    ChangeReport,
    UploadReport,
    ApproveReport,
    AddUser,
    ViewUser,
    DeleteUser,
    AddExternalUser,
    ManageEquipment,
    AddAnotacion,
}

/// Roll -> behörigheter. Läses vid API-gränsen, aldrig av kärntjänsterna.
pub const ROLE_PERMISSIONS: &[(Role, &[Permission])] = &[
    (Role::Cliente, &[Permission::ViewReport]),
    (
        Role::Gerente,
        &[
            Permission::AddUser,
            Permission::ViewUser,
            Permission::DeleteUser,
            Permission::AddExternalUser,
            Permission::ManageEquipment,
            Permission::ViewReport,
            Permission::ChangeReport,
            Permission::AddAnotacion,
        ],
    ),
    (
        Role::DirectorTecnico,
        &[
            Permission::ManageEquipment,
            Permission::UploadReport,
            Permission::ViewReport,
            Permission::ChangeReport,
            Permission::ApproveReport,
            Permission::AddAnotacion,
            Permission::ViewUser,
        ],
    ),
    (
        Role::PersonalTecnicoApoyo,
        &[
            Permission::ManageEquipment,
            Permission::UploadReport,
            Permission::ViewReport,
            Permission::ChangeReport,
            Permission::AddAnotacion,
            Permission::ViewUser,
        ],
    ),
    (
        Role::PersonalAdministrativo,
        &[
            Permission::AddExternalUser,
            Permission::ViewUser,
            Permission::ViewReport,
            Permission::ChangeReport,
            Permission::AddAnotacion,
        ],
    ),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Option<i64>,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub is_staff: bool,
    pub roles: HashSet<Role>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Default for User {
    fn default() -> Self {
        Self {
            id: None,
            username: String::new(),
            first_name: None,
            last_name: None,
            email: None,
            is_staff: false,
            roles: HashSet::new(),
            created_at: None,
        }
    }
}

impl User {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Default::default()
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.roles.insert(role);
        self
    }

    pub fn full_name(&self) -> Option<String> {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(f), Some(l)) => Some(format!("{} {}", f, l)),
            (Some(f), None) => Some(f.to_string()),
            (None, Some(l)) => Some(l.to_string()),
            (None, None) => None,
        }
    }

    /// Namn för visning, faller tillbaka på användarnamnet
    pub fn display_name(&self) -> String {
        match (self.full_name(), self.email.as_deref()) {
            (Some(name), Some(email)) => format!("{} ({})", name, email),
            (Some(name), None) => format!("{} ({})", name, self.username),
            (None, _) => self.username.clone(),
        }
    }

    pub fn is_internal(&self) -> bool {
        self.is_staff || self.roles.iter().any(Role::is_internal)
    }

    pub fn validate(&self) -> Result<(), UserValidationError> {
        if self.username.trim().is_empty() {
            return Err(UserValidationError::EmptyUsername);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserValidationError {
    #[error("Användarnamn krävs")]
    EmptyUsername,
}
