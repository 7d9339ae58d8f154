use hdrhistogram::Histogram;
use karga::{Aggregate, Metric, Report};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, time::Duration};

/// Outcome of a request that got a response, whatever its status.
#[derive(Clone, Debug, PartialEq, PartialOrd)]
pub struct HttpResponseMetric {
    pub method: String,
    /// Path the request was issued for, used to attribute it in the report.
    pub name: String,
    pub latency: Duration,
    pub status_code: u16,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

impl HttpResponseMetric {
    /// Statuses outside `200..400` are counted as failures.
    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.status_code)
    }
}

// A request can fail before any response arrives, then there is no latency to record
#[derive(Clone, Debug, PartialEq, PartialOrd)]
pub enum HttpMetric {
    Success(HttpResponseMetric),
    Failure {
        method: String,
        name: String,
        reason: String,
    },
}

impl HttpMetric {
    pub fn endpoint(&self) -> (&str, &str) {
        match self {
            HttpMetric::Success(metric) => (&metric.method, &metric.name),
            HttpMetric::Failure { method, name, .. } => (method, name),
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            HttpMetric::Success(metric) => Some(metric.status_code),
            HttpMetric::Failure { .. } => None,
        }
    }
}

impl Metric for HttpMetric {}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct EndpointStats {
    pub requests: u64,
    pub failures: u64,
    pub status_count: HashMap<u16, u64>,
    pub errors: HashMap<String, u64>,
}

impl EndpointStats {
    fn merge(&mut self, other: EndpointStats) {
        self.requests += other.requests;
        self.failures += other.failures;
        for (status_code, other_count) in other.status_count {
            *self.status_count.entry(status_code).or_default() += other_count;
        }
        for (error, other_count) in other.errors {
            *self.errors.entry(error).or_default() += other_count;
        }
    }
}

#[derive(Clone)]
pub struct HttpAggregate {
    pub latency_hist: Histogram<u64>,
    pub status_count: HashMap<u16, u64>,
    pub endpoints: HashMap<(String, String), EndpointStats>,
    pub total_bytes_sent: u64,
    pub total_bytes_received: u64,
    pub count: u64,
    pub failure_count: u64,
}

impl HttpAggregate {
    fn endpoint_mut(&mut self, method: &str, name: &str) -> &mut EndpointStats {
        self.endpoints
            .entry((method.to_owned(), name.to_owned()))
            .or_default()
    }

    pub fn endpoint(&self, method: &str, name: &str) -> Option<&EndpointStats> {
        self.endpoints.get(&(method.to_owned(), name.to_owned()))
    }
}

impl Aggregate for HttpAggregate {
    type Metric = HttpMetric;

    fn new() -> Self {
        Self {
            latency_hist: Histogram::new(3).expect("Create histogram"),
            status_count: HashMap::new(),
            endpoints: HashMap::new(),
            total_bytes_sent: 0,
            total_bytes_received: 0,
            count: 0,
            failure_count: 0,
        }
    }

    fn consume(&mut self, metric: &Self::Metric) {
        match metric {
            HttpMetric::Success(metric) => {
                *self.status_count.entry(metric.status_code).or_default() += 1;
                self.total_bytes_sent += metric.bytes_sent;
                self.total_bytes_received += metric.bytes_received;

                let recorded = self.latency_hist.record(metric.latency.as_nanos() as u64);
                if let Err(err) = &recorded {
                    tracing::warn!("Ignoring latency reading due to error: {err}");
                }
                let failed = recorded.is_err() || !metric.is_success();
                if failed {
                    self.failure_count += 1;
                }

                let endpoint = self.endpoint_mut(&metric.method, &metric.name);
                endpoint.requests += 1;
                *endpoint.status_count.entry(metric.status_code).or_default() += 1;
                if failed {
                    endpoint.failures += 1;
                    let reason = match recorded {
                        Err(err) => err.to_string(),
                        Ok(()) => format!("HTTP {}", metric.status_code),
                    };
                    *endpoint.errors.entry(reason).or_default() += 1;
                }
            }
            HttpMetric::Failure {
                method,
                name,
                reason,
            } => {
                self.failure_count += 1;
                let endpoint = self.endpoint_mut(method, name);
                endpoint.requests += 1;
                endpoint.failures += 1;
                *endpoint.errors.entry(reason.clone()).or_default() += 1;
            }
        };
        self.count += 1;
    }

    fn merge(&mut self, other: Self) {
        self.latency_hist += other.latency_hist;

        for (status_code, other_count) in other.status_count {
            *self.status_count.entry(status_code).or_default() += other_count;
        }
        for (key, other_stats) in other.endpoints {
            self.endpoints.entry(key).or_default().merge(other_stats);
        }
        self.total_bytes_sent += other.total_bytes_sent;
        self.total_bytes_received += other.total_bytes_received;
        self.failure_count += other.failure_count;
        self.count += other.count;
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct HttpLatencyStats {
    pub avg: Duration,
    pub min: Duration,
    pub med: Duration,
    pub max: Duration,
    pub p90: Duration,
    pub p95: Duration,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct EndpointReport {
    pub method: String,
    pub name: String,
    pub requests: u64,
    pub failures: u64,
    pub status_codes: HashMap<u16, u64>,
    pub errors: HashMap<String, u64>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct HttpReport {
    pub req_duration: HttpLatencyStats,
    pub reqs_total: u64,
    /// Percentage of requests that failed, 0 when nothing was sent.
    pub req_failure_ratio: f64,
    pub status_codes: HashMap<u16, u64>,
    pub data_sent: u64,
    pub data_received: u64,
    pub endpoints: Vec<EndpointReport>,
}

impl From<HttpAggregate> for HttpReport {
    fn from(value: HttpAggregate) -> Self {
        let req_duration = HttpLatencyStats {
            avg: Duration::from_nanos(value.latency_hist.mean() as u64),
            min: Duration::from_nanos(value.latency_hist.min()),
            med: Duration::from_nanos(value.latency_hist.value_at_quantile(0.5)),
            max: Duration::from_nanos(value.latency_hist.max()),
            p90: Duration::from_nanos(value.latency_hist.value_at_quantile(0.90)),
            p95: Duration::from_nanos(value.latency_hist.value_at_quantile(0.95)),
        };

        let req_failure_ratio = if value.count == 0 {
            0.0
        } else {
            (value.failure_count as f64 / value.count as f64) * 100.0
        };

        let mut endpoints: Vec<EndpointReport> = value
            .endpoints
            .into_iter()
            .map(|((method, name), stats)| EndpointReport {
                method,
                name,
                requests: stats.requests,
                failures: stats.failures,
                status_codes: stats.status_count,
                errors: stats.errors,
            })
            .collect();
        endpoints.sort_by(|a, b| (&a.name, &a.method).cmp(&(&b.name, &b.method)));

        Self {
            req_duration,
            reqs_total: value.count,
            req_failure_ratio,
            status_codes: value.status_count,
            data_sent: value.total_bytes_sent,
            data_received: value.total_bytes_received,
            endpoints,
        }
    }
}

impl Report<HttpAggregate> for HttpReport {}
