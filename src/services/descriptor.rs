//! Typed service descriptors.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    /// Network-backed; routed through the fallback manager.
    Async,
    /// Local lookup; remote first, fallback on error, no manager state.
    Sync,
}

/// Static description of one logical data service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceDescriptor {
    pub name: &'static str,
    pub async_functions: &'static [&'static str],
    pub sync_functions: &'static [&'static str],
}

/// Functions every entity service exposes.
const ENTITY_ASYNC: &[&str] = &["list", "get", "search"];
const ENTITY_SYNC: &[&str] = &["categories"];

pub const EVENTS: ServiceDescriptor = ServiceDescriptor {
    name: "events",
    async_functions: ENTITY_ASYNC,
    sync_functions: ENTITY_SYNC,
};

pub const PERSONS: ServiceDescriptor = ServiceDescriptor {
    name: "persons",
    async_functions: ENTITY_ASYNC,
    sync_functions: ENTITY_SYNC,
};

pub const PLACES: ServiceDescriptor = ServiceDescriptor {
    name: "places",
    async_functions: ENTITY_ASYNC,
    sync_functions: ENTITY_SYNC,
};

pub const DYNASTIES: ServiceDescriptor = ServiceDescriptor {
    name: "dynasties",
    async_functions: ENTITY_ASYNC,
    sync_functions: ENTITY_SYNC,
};

pub const EMPERORS: ServiceDescriptor = ServiceDescriptor {
    name: "emperors",
    async_functions: ENTITY_ASYNC,
    sync_functions: ENTITY_SYNC,
};

impl ServiceDescriptor {
    /// `"{service}.{function}"`, used to correlate logs.
    pub fn operation_name(&self, function: &str) -> String {
        format!("{}.{}", self.name, function)
    }

    pub fn kind_of(&self, function: &str) -> Option<FunctionKind> {
        if self.async_functions.contains(&function) {
            Some(FunctionKind::Async)
        } else if self.sync_functions.contains(&function) {
            Some(FunctionKind::Sync)
        } else {
            None
        }
    }

    pub fn functions(&self) -> impl Iterator<Item = &'static str> {
        self.async_functions
            .iter()
            .chain(self.sync_functions.iter())
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_name() {
        assert_eq!(EVENTS.operation_name("list"), "events.list");
        assert_eq!(EMPERORS.operation_name("get"), "emperors.get");
    }

    #[test]
    fn test_kind_of() {
        assert_eq!(PERSONS.kind_of("search"), Some(FunctionKind::Async));
        assert_eq!(PERSONS.kind_of("categories"), Some(FunctionKind::Sync));
        assert_eq!(PERSONS.kind_of("delete_everything"), None);
        assert_eq!(PLACES.functions().count(), 4);
    }
}
