/// Hard ceiling on a route's total duration, in minutes. Applies to every
/// route regardless of vehicle or shift.
pub const MAX_ROUTE_TIME_MINUTES: i32 = 90;
