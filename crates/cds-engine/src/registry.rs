use futures::channel::mpsc;
use serde::{Serialize, Deserialize};

use crate::engine::EngineNotice;

/// Opaque connection handle assigned by the boundary layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnId(pub u64);

/// A live connection paired with its notice outbox.
#[derive(Debug, Clone)]
pub struct Participant {
    pub conn: ConnId,
    pub outbox: mpsc::UnboundedSender<EngineNotice>,
}

#[derive(Debug, Clone)]
pub enum DesignerSlot {
    Empty,
    Bound(Participant),
}

impl DesignerSlot {
    pub fn is_empty(&self) -> bool {
        matches!(self, DesignerSlot::Empty)
    }

    pub fn participant(&self) -> Option<&Participant> {
        match self {
            DesignerSlot::Empty => None,
            DesignerSlot::Bound(participant) => Some(participant),
        }
    }
}

/// Maps connections to the administrator role or a designer slot. The
/// slot table always holds exactly one entry per designer index.
#[derive(Debug, Default)]
pub struct ParticipantRegistry {
    admin: Option<Participant>,
    observers: Vec<Participant>,
    designers: Vec<DesignerSlot>,
}

impl ParticipantRegistry {
    pub fn new(num_designers: usize) -> Self {
        Self {
            admin: None,
            observers: Vec::new(),
            designers: vec![DesignerSlot::Empty; num_designers],
        }
    }

    /// Promotes the connection to administrator, or keeps it as a pure
    /// observer when the role is already taken. Returns whether it was
    /// promoted.
    pub fn bind_admin(&mut self, participant: Participant) -> bool {
        if self.admin.is_none() {
            self.admin = Some(participant);
            true
        } else {
            self.observers.push(participant);
            false
        }
    }

    /// Binds to the lowest-index empty slot.
    pub fn bind_designer(&mut self, participant: Participant) -> Option<usize> {
        let index = self.designers.iter().position(DesignerSlot::is_empty)?;
        self.designers[index] = DesignerSlot::Bound(participant);
        Some(index)
    }

    /// Clears every binding held by this connection. Designer slots are
    /// emptied, never removed.
    pub fn unbind(&mut self, conn: ConnId) {
        if self.admin.as_ref().map(|admin| admin.conn) == Some(conn) {
            self.admin = None;
        }
        self.observers.retain(|observer| observer.conn != conn);
        for slot in &mut self.designers {
            if slot.participant().map(|p| p.conn) == Some(conn) {
                *slot = DesignerSlot::Empty;
            }
        }
    }

    pub fn designer_index(&self, conn: ConnId) -> Option<usize> {
        self.designers.iter().position(|slot| {
            slot.participant().map(|p| p.conn) == Some(conn)
        })
    }

    pub fn designer(&self, index: usize) -> Option<&Participant> {
        self.designers.get(index).and_then(DesignerSlot::participant)
    }

    /// Bound designers with their slot index.
    pub fn designers(&self) -> impl Iterator<Item = (usize, &Participant)> {
        self.designers.iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.participant().map(|p| (index, p)))
    }

    /// The administrator plus any observers, the audience of full-view
    /// notices.
    pub fn admin_side(&self) -> impl Iterator<Item = &Participant> {
        self.admin.iter().chain(self.observers.iter())
    }

    pub fn slot_count(&self) -> usize {
        self.designers.len()
    }

    pub fn bound_count(&self) -> usize {
        self.designers.iter().filter(|slot| !slot.is_empty()).count()
    }

    /// Reconciles the table against a new designer count. Displaced
    /// participants are returned so the caller can notify them.
    pub fn resize(&mut self, num_designers: usize) -> Vec<Participant> {
        let mut evicted = Vec::new();
        while self.designers.len() > num_designers {
            if let Some(DesignerSlot::Bound(participant)) = self.designers.pop() {
                evicted.push(participant);
            }
        }
        while self.designers.len() < num_designers {
            self.designers.push(DesignerSlot::Empty);
        }
        evicted
    }
}
