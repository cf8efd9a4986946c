//! Broker connection settings.

/// Prefetch count: one unacknowledged delivery at a time.
pub const DEFAULT_PREFETCH: u16 = 1;

/// RabbitMQ connection and queue configuration.
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    /// Durable queue the worker consumes from (and the test endpoint
    /// publishes to).
    pub queue: String,
    pub prefetch: u16,
}

impl ConsumerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default               |
    /// |------------------------|-----------------------|
    /// | `RABBITMQ_HOST`        | `localhost`           |
    /// | `RABBITMQ_PORT`        | `5672`                |
    /// | `RABBITMQ_USER`        | `guest`               |
    /// | `RABBITMQ_PASSWORD`    | `guest`               |
    /// | `RABBITMQ_IMAGE_QUEUE` | `stolink.image.queue` |
    pub fn from_env() -> Self {
        let port: u16 = std::env::var("RABBITMQ_PORT")
            .unwrap_or_else(|_| "5672".into())
            .parse()
            .expect("RABBITMQ_PORT must be a valid u16");

        Self {
            host: std::env::var("RABBITMQ_HOST").unwrap_or_else(|_| "localhost".into()),
            port,
            user: std::env::var("RABBITMQ_USER").unwrap_or_else(|_| "guest".into()),
            password: std::env::var("RABBITMQ_PASSWORD").unwrap_or_else(|_| "guest".into()),
            queue: std::env::var("RABBITMQ_IMAGE_QUEUE")
                .unwrap_or_else(|_| "stolink.image.queue".into()),
            prefetch: DEFAULT_PREFETCH,
        }
    }

    /// AMQP URI for the default vhost.
    pub fn amqp_url(&self) -> String {
        format!(
            "amqp://{}:{}@{}:{}/%2f",
            self.user, self.password, self.host, self.port
        )
    }

    /// Host and port only, for logs.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 5672,
            user: "guest".into(),
            password: "guest".into(),
            queue: "stolink.image.queue".into(),
            prefetch: DEFAULT_PREFETCH,
        }
    }
}
