use serde::{Deserialize, Serialize};

fn default_reps_url() -> String {
    "http://localhost:8501".to_string()
}

fn default_dashboard_url() -> String {
    "http://localhost:8000".to_string()
}

/// Base URLs of the two externally hosted dashboard services the sidebar
/// links out to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavConfig {
    #[serde(default = "default_reps_url")]
    pub reps_url: String,
    #[serde(default = "default_dashboard_url")]
    pub dashboard_url: String,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            reps_url: default_reps_url(),
            dashboard_url: default_dashboard_url(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavLink {
    pub label: String,
    pub href: String,
    pub external: bool,
}

fn internal(label: &str, href: &str) -> NavLink {
    NavLink {
        label: label.to_string(),
        href: href.to_string(),
        external: false,
    }
}

/// The fixed profile sidebar link set. The two external dashboards carry the
/// user's id and name directly in the query string, matching what those
/// services expect to read back out.
pub fn sidebar_links(user_id: &str, user_name: &str, config: &NavConfig) -> Vec<NavLink> {
    vec![
        internal("Update Profile", "/pages/profile/update"),
        internal("Update Diet Profile", "/pages/profile/diet"),
        internal("Meal Plan", "/pages/profile/meal-plan"),
        internal("Water Intake", "/pages/profile/water-intake"),
        internal("Suggested Diet", "/pages/diet"),
        NavLink {
            label: "Reps Count".to_string(),
            href: format!("{}/?id={}&name={}", config.reps_url, user_id, user_name),
            external: true,
        },
        NavLink {
            label: "Fitness Dashboard".to_string(),
            href: format!("{}/dashboard/{}", config.dashboard_url, user_id),
            external: true,
        },
    ]
}
