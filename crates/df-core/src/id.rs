//! Reminder identifier generation

/// Length of generated reminder ids
pub const ID_LENGTH: usize = 16;

/// Source of fresh, collision-free identifiers
pub trait IdGenerator: Send + Sync {
    fn new_id(&self) -> String;
}

/// Random 16 character ids drawn from a v4 UUID
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn new_id(&self) -> String {
        let mut id = uuid::Uuid::new_v4().simple().to_string();
        id.truncate(ID_LENGTH);
        id
    }
}
