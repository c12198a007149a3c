//! Store metrics collection.

use std::time::Instant;

use metrics::histogram;

/// Record the duration of one store query.
pub fn record_query_duration(query_name: &str, duration_secs: f64) {
    histogram!(
        "request_store_query_duration_seconds",
        "query" => query_name.to_string()
    )
    .record(duration_secs);
}

/// Times a store operation and records it under the query name.
///
/// ```ignore
/// let timer = QueryTimer::new("find_request_by_uuid");
/// let result = sqlx::query_as::<_, RequestEntity>(...).fetch_optional(&pool).await;
/// timer.record();
/// result
/// ```
pub struct QueryTimer {
    query_name: String,
    start: Instant,
}

impl QueryTimer {
    pub fn new(query_name: impl Into<String>) -> Self {
        Self {
            query_name: query_name.into(),
            start: Instant::now(),
        }
    }

    pub fn record(self) {
        let duration = self.start.elapsed().as_secs_f64();
        record_query_duration(&self.query_name, duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_timer_keeps_its_name() {
        let timer = QueryTimer::new("insert_request");
        assert_eq!(timer.query_name, "insert_request");
    }
}
