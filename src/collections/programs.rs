use log::info;

use crate::error::{PortalError, PortalResult};
use crate::models::{default_programs, Program, PROGRAMS_KEY};
use crate::session::CredentialGate;
use crate::sync::Persistence;

/// Academic programs used as document categories.
pub struct Programs<'a> {
    sync: &'a Persistence,
}

impl<'a> Programs<'a> {
    pub(crate) fn new(sync: &'a Persistence) -> Self {
        Self { sync }
    }

    pub fn list(&self) -> Vec<Program> {
        self.sync
            .read(PROGRAMS_KEY)
            .unwrap_or_else(default_programs)
    }

    pub fn get(&self, id: &str) -> Option<Program> {
        self.list().into_iter().find(|p| p.id == id)
    }

    pub fn name_of(&self, id: &str) -> Option<String> {
        self.get(id).map(|p| p.name)
    }

    /// Adds a program whose id is derived from `name`. Rejected when the id
    /// is taken or a program already has the same name ignoring case.
    pub fn add(&self, name: &str) -> PortalResult<Program> {
        CredentialGate::new(self.sync).require_admin("adding a program")?;

        let name = name.trim();
        if name.is_empty() {
            return Err(PortalError::validation("program name cannot be empty"));
        }
        let program = Program::from_name(name);
        let lowered = name.to_lowercase();

        let (added, _) = self.sync.update(PROGRAMS_KEY, default_programs, |programs: &mut Vec<Program>| {
            let taken = programs
                .iter()
                .any(|p: &Program| p.id == program.id || p.name.to_lowercase() == lowered);
            if taken {
                return Err(PortalError::Duplicate(format!(
                    "a program named '{name}' already exists"
                )));
            }
            programs.push(program.clone());
            Ok(program.clone())
        })?;

        info!("Added program '{}' ({})", added.name, added.id);
        Ok(added)
    }

    /// Removes a program. Documents in that category are left alone and show
    /// up as uncategorized.
    pub fn remove(&self, id: &str) -> PortalResult<Program> {
        CredentialGate::new(self.sync).require_admin("removing a program")?;

        let (removed, _) = self.sync.update(PROGRAMS_KEY, default_programs, |programs: &mut Vec<Program>| {
            let index = programs
                .iter()
                .position(|p| p.id == id)
                .ok_or_else(|| PortalError::NotFound(format!("program '{id}'")))?;
            Ok(programs.remove(index))
        })?;

        info!("Removed program '{}'", removed.id);
        Ok(removed)
    }
}
