//! Process-wide text coercions for scalar values
//!
//! Serializers render every scalar through [`render`]. A coercion registered
//! for the scalar's [`Kind`] takes precedence over its default `Display`
//! conversion, which makes this the hook for localized numbers, alternate
//! boolean spellings or caller-defined value objects.
//!
//! Registration is meant for start-up. Lookups take a shared read lock and are
//! safe from any number of threads.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use crate::value::Scalar;

/// Formatting function applied to a scalar
pub type Coercion = Arc<dyn Fn(&Scalar) -> String + Send + Sync>;

/// Semantic kind of a scalar, used as the registry key
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    Text,
    Integer,
    Decimal,
    Boolean,
    Date,
    Custom(String),
}

impl Kind {
    pub fn of(scalar: &Scalar) -> Self {
        match scalar {
            Scalar::Text(_) => Self::Text,
            Scalar::Integer(_) => Self::Integer,
            Scalar::Decimal(_) => Self::Decimal,
            Scalar::Boolean(_) => Self::Boolean,
            Scalar::Date(_) => Self::Date,
            Scalar::Custom { tag, .. } => Self::Custom(tag.clone()),
        }
    }
}

static REGISTRY: LazyLock<RwLock<HashMap<Kind, Coercion>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Registers `coercion` for `kind`, replacing any earlier registration
pub fn register<F>(kind: Kind, coercion: F)
where
    F: Fn(&Scalar) -> String + Send + Sync + 'static,
{
    REGISTRY.write().insert(kind, Arc::new(coercion));
}

/// Removes the coercion for `kind`; returns whether one was registered
pub fn unregister(kind: &Kind) -> bool {
    REGISTRY.write().remove(kind).is_some()
}

pub fn is_registered(kind: &Kind) -> bool {
    REGISTRY.read().contains_key(kind)
}

/// Renders `scalar` as XML text
pub fn render(scalar: &Scalar) -> String {
    // Clone the handle so user code never runs under the lock.
    let coercion = REGISTRY.read().get(&Kind::of(scalar)).cloned();
    match coercion {
        Some(coercion) => coercion(scalar),
        None => scalar.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The registry is global; each test uses its own custom tag.

    #[test]
    fn test_render_falls_back_to_display() {
        assert_eq!(render(&Scalar::Text("01".to_string())), "01");
        assert_eq!(render(&Scalar::Integer(100)), "100");
        assert_eq!(render(&Scalar::custom("unregistered", "raw")), "raw");
    }

    #[test]
    fn test_registered_coercion_applies() {
        let kind = Kind::Custom("cents".to_string());
        register(kind.clone(), |s| match s {
            Scalar::Custom { value, .. } => format!("{value}00"),
            other => other.to_string(),
        });

        assert!(is_registered(&kind));
        assert_eq!(render(&Scalar::custom("cents", "12")), "1200");
        assert_eq!(render(&Scalar::custom("other", "12")), "12");

        assert!(unregister(&kind));
        assert!(!unregister(&kind));
        assert_eq!(render(&Scalar::custom("cents", "12")), "12");
    }

    #[test]
    fn test_register_replaces() {
        let kind = Kind::Custom("flag".to_string());
        register(kind.clone(), |_| "first".to_string());
        register(kind.clone(), |_| "second".to_string());
        assert_eq!(render(&Scalar::custom("flag", "")), "second");
        unregister(&kind);
    }

    #[test]
    fn test_concurrent_reads() {
        let kind = Kind::Custom("shout".to_string());
        register(kind.clone(), |s| s.to_string().to_uppercase());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                std::thread::spawn(|| {
                    (0..100)
                        .map(|_| render(&Scalar::custom("shout", "ok")))
                        .all(|s| s == "OK")
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap_or(false));
        }
        unregister(&kind);
    }
}
