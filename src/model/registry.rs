use std::collections::HashMap;

use chrono::{DateTime, Utc};
use log::debug;
use rand::{distributions::Alphanumeric, Rng};

use crate::error::{Error, Result};
use crate::model::{
    common::{Caller, ElectionId, Principal},
    election::{Election, ElectionLimits, ElectionSpec, ElectionStatus},
};

const ACCESS_TOKEN_LENGTH: usize = 16;

/// Owns every election, hands out dense IDs, and remembers who created what.
#[derive(Debug)]
pub struct ElectionRegistry {
    elections: Vec<Election>,
    by_creator: HashMap<Principal, Vec<ElectionId>>,
    limits: ElectionLimits,
    access_url_base: String,
}

impl ElectionRegistry {
    pub fn new(limits: ElectionLimits, access_url_base: impl Into<String>) -> Self {
        Self {
            elections: Vec::new(),
            by_creator: HashMap::new(),
            limits,
            access_url_base: access_url_base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn limits(&self) -> &ElectionLimits {
        &self.limits
    }

    /// Validate `spec` and store it as a new draft election owned by `caller`.
    pub fn create(
        &mut self,
        caller: &Caller,
        spec: ElectionSpec,
        now: DateTime<Utc>,
        rng: &mut impl Rng,
    ) -> Result<ElectionId> {
        spec.validate(&self.limits, now)?;

        let id = ElectionId::try_from(self.elections.len() + 1)
            .map_err(|_| Error::invalid_input("No more election IDs available"))?;
        let token: String = rng
            .sample_iter(&Alphanumeric)
            .take(ACCESS_TOKEN_LENGTH)
            .map(char::from)
            .collect();
        let access_url = format!("{}/vote/{id}/{token}", self.access_url_base);
        debug!("Election {id} gets access URL {access_url}");

        self.elections.push(Election::new(
            id,
            caller.principal.clone(),
            spec,
            access_url,
            now,
        ));
        self.by_creator
            .entry(caller.principal.clone())
            .or_default()
            .push(id);
        Ok(id)
    }

    /// Look up an election whether or not it has been deleted.
    pub(crate) fn find(&self, id: ElectionId) -> Result<&Election> {
        (id as usize)
            .checked_sub(1)
            .and_then(|index| self.elections.get(index))
            .ok_or_else(|| Error::not_found(format!("Election {id}")))
    }

    pub(crate) fn find_mut(&mut self, id: ElectionId) -> Result<&mut Election> {
        (id as usize)
            .checked_sub(1)
            .and_then(|index| self.elections.get_mut(index))
            .ok_or_else(|| Error::not_found(format!("Election {id}")))
    }

    pub fn get(&self, id: ElectionId) -> Result<&Election> {
        let election = self.find(id)?;
        if election.is_deleted() {
            return Err(Error::Deleted(id));
        }
        Ok(election)
    }

    pub fn get_mut(&mut self, id: ElectionId) -> Result<&mut Election> {
        let election = self.find_mut(id)?;
        if election.is_deleted() {
            return Err(Error::Deleted(id));
        }
        Ok(election)
    }

    /// Soft-delete an election. Only its creator may do this.
    pub fn delete(&mut self, caller: &Caller, id: ElectionId) -> Result<ElectionStatus> {
        self.get_mut(id)?
            .transition(caller, ElectionStatus::Deleted)
    }

    /// IDs of the live elections created by `principal`, oldest first.
    pub fn created_by(&self, principal: &Principal) -> Vec<ElectionId> {
        self.by_creator
            .get(principal)
            .map(|ids| {
                ids.iter()
                    .copied()
                    .filter(|id| self.get(*id).is_ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.elections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elections.is_empty()
    }
}
