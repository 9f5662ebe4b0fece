use uuid::Uuid;

use super::types::TokenPairId;

/// Source of token pair correlation ids.
pub trait TokenPairIdGenerator: Send + Sync {
    fn generate(&self) -> TokenPairId;
}

/// Random (v4) UUIDs.
#[derive(Clone, Copy, Debug, Default)]
pub struct UuidGenerator;

impl TokenPairIdGenerator for UuidGenerator {
    fn generate(&self) -> TokenPairId {
        TokenPairId::new(Uuid::new_v4().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_generator_yields_unique_v4() {
        let generator = UuidGenerator;
        let first = generator.generate();
        let second = generator.generate();
        assert_ne!(first, second);
        let parsed = Uuid::parse_str(first.as_str()).map(|uuid| uuid.get_version_num());
        assert_eq!(parsed.ok(), Some(4));
    }
}
