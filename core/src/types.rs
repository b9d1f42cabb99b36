//! Shared primitive types used across the engine.

/// A stable identifier for a student user (the platform's auth user id).
pub type UserId = String;

/// A stable identifier for any non-student entity: seller, affiliate,
/// university, application or withdrawal request.
pub type EntityId = String;

/// A dollar amount. Amounts are never rounded inside the engine;
/// rounding to cents happens only at display time.
pub type Amount = f64;
