//! External configuration: credentials file and environment variables.
//!
//! Properties for a service named `results_reports_api` are read from keys
//! prefixed `RESULTS_REPORTS_API_`, e.g. `RESULTS_REPORTS_API_URL`. The
//! credentials file wins over the environment when it defines any property
//! for the service.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::auth::{
    AuthType, Authenticator, BasicAuthenticator, BearerTokenAuthenticator,
    CloudPakForDataAuthenticator, ContainerAuthenticator, IamAssumeAuthenticator,
    IamAuthenticator, NoAuthAuthenticator,
};
use crate::error::Error;

/// Environment variable naming the credentials file.
pub const CREDENTIALS_FILE_ENV: &str = "IBM_CREDENTIALS_FILE";

/// Credentials file looked up in the working and home directories.
pub const DEFAULT_CREDENTIALS_FILENAME: &str = "ibm-credentials.env";

pub const PROP_URL: &str = "URL";
pub const PROP_AUTH_TYPE: &str = "AUTH_TYPE";
pub const PROP_APIKEY: &str = "APIKEY";
pub const PROP_AUTH_URL: &str = "AUTH_URL";
pub const PROP_USERNAME: &str = "USERNAME";
pub const PROP_PASSWORD: &str = "PASSWORD";
pub const PROP_DISABLE_SSL: &str = "DISABLE_SSL";
pub const PROP_AUTH_DISABLE_SSL: &str = "AUTH_DISABLE_SSL";
pub const PROP_BEARER_TOKEN: &str = "BEARER_TOKEN";
pub const PROP_CR_TOKEN_FILENAME: &str = "CR_TOKEN_FILENAME";
pub const PROP_IAM_PROFILE_NAME: &str = "IAM_PROFILE_NAME";
pub const PROP_IAM_PROFILE_ID: &str = "IAM_PROFILE_ID";
pub const PROP_IAM_PROFILE_CRN: &str = "IAM_PROFILE_CRN";
pub const PROP_IAM_ACCOUNT_ID: &str = "IAM_ACCOUNT_ID";
pub const PROP_CLIENT_ID: &str = "CLIENT_ID";
pub const PROP_CLIENT_SECRET: &str = "CLIENT_SECRET";
pub const PROP_SCOPE: &str = "SCOPE";
pub const PROP_ENABLE_RETRIES: &str = "ENABLE_RETRIES";
pub const PROP_MAX_RETRIES: &str = "MAX_RETRIES";
pub const PROP_RETRY_INTERVAL: &str = "RETRY_INTERVAL";
pub const PROP_ENABLE_GZIP: &str = "ENABLE_GZIP";

const KNOWN_PROPERTIES: &[&str] = &[
    PROP_URL,
    PROP_AUTH_TYPE,
    PROP_APIKEY,
    PROP_AUTH_URL,
    PROP_USERNAME,
    PROP_PASSWORD,
    PROP_DISABLE_SSL,
    PROP_AUTH_DISABLE_SSL,
    PROP_BEARER_TOKEN,
    PROP_CR_TOKEN_FILENAME,
    PROP_IAM_PROFILE_NAME,
    PROP_IAM_PROFILE_ID,
    PROP_IAM_PROFILE_CRN,
    PROP_IAM_ACCOUNT_ID,
    PROP_CLIENT_ID,
    PROP_CLIENT_SECRET,
    PROP_SCOPE,
    PROP_ENABLE_RETRIES,
    PROP_MAX_RETRIES,
    PROP_RETRY_INTERVAL,
    PROP_ENABLE_GZIP,
];

/// Environment prefix for a service name: `admin_service_api` becomes
/// `ADMIN_SERVICE_API`.
pub fn env_prefix(service_name: &str) -> String {
    service_name.replace('-', "_").to_ascii_uppercase()
}

/// Configuration properties for one service, keyed by unprefixed name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceProperties {
    values: HashMap<String, String>,
}

impl ServiceProperties {
    /// Load from the credentials file and the process environment.
    pub fn load(service_name: &str) -> Self {
        Self::load_with(service_name, |key| std::env::var(key).ok())
    }

    /// Load using `env` to look up environment variables.
    pub fn load_with<F>(service_name: &str, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let prefix = env_prefix(service_name);

        if let Some(path) = credentials_file(&env) {
            match std::fs::read_to_string(&path) {
                Ok(contents) => {
                    let props = Self::parse_credentials(&prefix, &contents);
                    if !props.is_empty() {
                        debug!(path = %path.display(), service = service_name, "loaded credentials file");
                        return props;
                    }
                }
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "credentials file not readable");
                }
            }
        }

        let values = KNOWN_PROPERTIES
            .iter()
            .filter_map(|name| {
                env(&format!("{prefix}_{name}")).map(|value| ((*name).to_owned(), value))
            })
            .collect();
        Self { values }
    }

    /// Parse `KEY=VALUE` lines, keeping those that start with `prefix_`.
    ///
    /// When a key repeats, its first value is kept.
    pub fn parse_credentials(prefix: &str, contents: &str) -> Self {
        let wanted = format!("{prefix}_");
        let mut values = HashMap::new();
        for (key, value) in contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| line.split_once('='))
        {
            if let Some(name) = key.trim().strip_prefix(&wanted) {
                values
                    .entry(name.to_owned())
                    .or_insert_with(|| value.trim().to_owned());
            }
        }
        Self { values }
    }

    /// Build from explicit pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Raw value of a property; empty strings count as absent.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// A `true`/`false` property.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name)
            .map(|v| v.eq_ignore_ascii_case("true"))
    }

    /// A non-negative integer property.
    pub fn get_u32(&self, name: &str) -> Result<Option<u32>, Error> {
        self.get(name)
            .map(|v| {
                v.parse::<u32>().map_err(|e| {
                    Error::validation(format!("property {name} must be a non-negative integer: {e}"))
                })
            })
            .transpose()
    }

    /// A property given in whole seconds.
    pub fn get_duration_secs(&self, name: &str) -> Result<Option<Duration>, Error> {
        Ok(self.get_u32(name)?.map(|secs| Duration::from_secs(u64::from(secs))))
    }

    /// Whether no properties were found.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The selected authenticator variant.
    ///
    /// Without `AUTH_TYPE`, an API key selects IAM and anything else selects
    /// container authentication.
    pub fn auth_type(&self) -> Result<AuthType, Error> {
        match self.get(PROP_AUTH_TYPE) {
            Some(value) => value.parse(),
            None if self.get(PROP_APIKEY).is_some() => Ok(AuthType::Iam),
            None => Ok(AuthType::Container),
        }
    }
}

fn credentials_file<F>(env: &F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = env(CREDENTIALS_FILE_ENV).filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }
    let in_cwd = std::env::current_dir()
        .ok()
        .map(|dir| dir.join(DEFAULT_CREDENTIALS_FILENAME))
        .filter(|p| p.is_file());
    in_cwd.or_else(|| {
        env("HOME")
            .map(|home| PathBuf::from(home).join(DEFAULT_CREDENTIALS_FILENAME))
            .filter(|p| p.is_file())
    })
}

fn token_http_client(props: &ServiceProperties) -> Result<reqwest::Client, Error> {
    let disable = props.get_bool(PROP_AUTH_DISABLE_SSL).unwrap_or(false);
    reqwest::Client::builder()
        .danger_accept_invalid_certs(disable)
        .build()
        .map_err(|e| Error::validation(format!("failed to build token client: {e}")))
}

fn required<'a>(props: &'a ServiceProperties, name: &str) -> Result<&'a str, Error> {
    props
        .get(name)
        .ok_or_else(|| Error::validation(format!("the {name} property is required")))
}

/// Construct the authenticator described by `props`.
pub fn authenticator_from_properties(
    props: &ServiceProperties,
) -> Result<Arc<dyn Authenticator>, Error> {
    let auth_type = props.auth_type()?;
    debug!(auth_type = %auth_type, "configuring authenticator");
    let auth: Arc<dyn Authenticator> = match auth_type {
        AuthType::NoAuth => Arc::new(NoAuthAuthenticator),
        AuthType::Basic => Arc::new(BasicAuthenticator::new(
            props.get(PROP_USERNAME).unwrap_or_default(),
            props.get(PROP_PASSWORD).unwrap_or_default(),
        )?),
        AuthType::BearerToken => Arc::new(BearerTokenAuthenticator::new(
            props.get(PROP_BEARER_TOKEN).unwrap_or_default(),
        )?),
        AuthType::Iam => {
            let mut iam = IamAuthenticator::new(props.get(PROP_APIKEY).unwrap_or_default())?
                .with_url(props.get(PROP_AUTH_URL).unwrap_or_default())
                .with_http_client(token_http_client(props)?);
            if let (Some(id), Some(secret)) =
                (props.get(PROP_CLIENT_ID), props.get(PROP_CLIENT_SECRET))
            {
                iam = iam.with_client_credentials(id, secret);
            }
            if let Some(scope) = props.get(PROP_SCOPE) {
                iam = iam.with_scope(scope);
            }
            iam.validate()?;
            Arc::new(iam)
        }
        AuthType::Container => {
            let mut container = ContainerAuthenticator::new()?
                .with_cr_token_filename(props.get(PROP_CR_TOKEN_FILENAME).unwrap_or_default())
                .with_url(props.get(PROP_AUTH_URL).unwrap_or_default())
                .with_http_client(token_http_client(props)?);
            if let Some(name) = props.get(PROP_IAM_PROFILE_NAME) {
                container = container.with_iam_profile_name(name);
            }
            if let Some(id) = props.get(PROP_IAM_PROFILE_ID) {
                container = container.with_iam_profile_id(id);
            }
            if let Some(scope) = props.get(PROP_SCOPE) {
                container = container.with_scope(scope);
            }
            container.validate()?;
            Arc::new(container)
        }
        AuthType::Cp4d => {
            let url = required(props, PROP_AUTH_URL)?;
            let username = props.get(PROP_USERNAME).unwrap_or_default();
            let cp4d = match props.get(PROP_PASSWORD) {
                Some(password) => CloudPakForDataAuthenticator::with_password(url, username, password)?,
                None => CloudPakForDataAuthenticator::with_apikey(
                    url,
                    username,
                    props.get(PROP_APIKEY).unwrap_or_default(),
                )?,
            };
            Arc::new(cp4d.with_http_client(token_http_client(props)?))
        }
        AuthType::IamAssume => {
            let apikey = props.get(PROP_APIKEY).unwrap_or_default();
            let assume = if let Some(id) = props.get(PROP_IAM_PROFILE_ID) {
                IamAssumeAuthenticator::with_profile_id(apikey, id)?
            } else if let Some(crn) = props.get(PROP_IAM_PROFILE_CRN) {
                IamAssumeAuthenticator::with_profile_crn(apikey, crn)?
            } else {
                IamAssumeAuthenticator::with_profile_name(
                    apikey,
                    required(props, PROP_IAM_PROFILE_NAME)?,
                    required(props, PROP_IAM_ACCOUNT_ID)?,
                )?
            };
            Arc::new(
                assume
                    .with_url(props.get(PROP_AUTH_URL).unwrap_or_default())
                    .with_http_client(token_http_client(props)?),
            )
        }
    };
    Ok(auth)
}

/// Load properties for `service_name` and construct its authenticator.
pub fn authenticator_from_environment(service_name: &str) -> Result<Arc<dyn Authenticator>, Error> {
    authenticator_from_properties(&ServiceProperties::load(service_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn prefix_is_upper_snake() {
        assert_eq!(env_prefix("results_reports_api"), "RESULTS_REPORTS_API");
        assert_eq!(env_prefix("admin-service-api"), "ADMIN_SERVICE_API");
    }

    #[test]
    fn repeated_credentials_key_keeps_first_value() {
        let props = ServiceProperties::parse_credentials(
            "ADMIN_SERVICE_API",
            "ADMIN_SERVICE_API_URL=https://first.example.com\nADMIN_SERVICE_API_URL=https://second.example.com\n",
        );
        assert_eq!(props.get(PROP_URL), Some("https://first.example.com"));
    }

    #[test]
    fn environment_properties_are_unprefixed() {
        let env = env_from(&[
            ("ADMIN_SERVICE_API_URL", "https://admin.example.com"),
            ("ADMIN_SERVICE_API_AUTH_TYPE", "noauth"),
            ("RESULTS_REPORTS_API_URL", "https://other.example.com"),
            ("IBM_CREDENTIALS_FILE", "/nonexistent/ibm-credentials.env"),
        ]);
        let props = ServiceProperties::load_with("admin_service_api", env);
        assert_eq!(props.get(PROP_URL), Some("https://admin.example.com"));
        assert_eq!(props.auth_type().unwrap(), AuthType::NoAuth);
    }

    #[test]
    fn credentials_file_wins_over_environment() {
        let dir = std::env::temp_dir().join(format!("scc-creds-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("ibm-credentials.env");
        std::fs::write(
            &path,
            "# comment\n\nRESULTS_REPORTS_API_URL=https://file.example.com\nRESULTS_REPORTS_API_AUTH_TYPE=bearerToken\nRESULTS_REPORTS_API_BEARER_TOKEN = tok \nOTHER_URL=x\n",
        )
        .unwrap();

        let env = env_from(&[
            ("IBM_CREDENTIALS_FILE", path.to_str().unwrap()),
            ("RESULTS_REPORTS_API_URL", "https://env.example.com"),
        ]);
        let props = ServiceProperties::load_with("results_reports_api", env);
        assert_eq!(props.get(PROP_URL), Some("https://file.example.com"));
        assert_eq!(props.get(PROP_BEARER_TOKEN), Some("tok"));
        assert_eq!(props.auth_type().unwrap(), AuthType::BearerToken);
    }

    #[test]
    fn missing_auth_type_defaults_by_apikey() {
        let props = ServiceProperties::from_pairs([(PROP_APIKEY, "k")]);
        assert_eq!(props.auth_type().unwrap(), AuthType::Iam);
        let props = ServiceProperties::default();
        assert_eq!(props.auth_type().unwrap(), AuthType::Container);
    }

    #[test]
    fn unknown_auth_type_is_rejected() {
        let props = ServiceProperties::from_pairs([(PROP_AUTH_TYPE, "magic")]);
        let err = authenticator_from_properties(&props).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn basic_with_empty_password_is_rejected() {
        let props = ServiceProperties::from_pairs([
            (PROP_AUTH_TYPE, "basic"),
            (PROP_USERNAME, "user"),
        ]);
        let err = authenticator_from_properties(&props).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn each_variant_is_constructed() {
        let cases: Vec<(Vec<(&str, &str)>, AuthType)> = vec![
            (vec![(PROP_AUTH_TYPE, "noauth")], AuthType::NoAuth),
            (
                vec![(PROP_AUTH_TYPE, "basic"), (PROP_USERNAME, "u"), (PROP_PASSWORD, "p")],
                AuthType::Basic,
            ),
            (
                vec![(PROP_AUTH_TYPE, "bearertoken"), (PROP_BEARER_TOKEN, "t")],
                AuthType::BearerToken,
            ),
            (
                vec![(PROP_AUTH_TYPE, "iam"), (PROP_APIKEY, "k")],
                AuthType::Iam,
            ),
            (
                vec![(PROP_AUTH_TYPE, "container"), (PROP_IAM_PROFILE_NAME, "p")],
                AuthType::Container,
            ),
            (
                vec![
                    (PROP_AUTH_TYPE, "cp4d"),
                    (PROP_AUTH_URL, "https://cpd.example.com"),
                    (PROP_USERNAME, "u"),
                    (PROP_PASSWORD, "p"),
                ],
                AuthType::Cp4d,
            ),
            (
                vec![
                    (PROP_AUTH_TYPE, "iamassume"),
                    (PROP_APIKEY, "k"),
                    (PROP_IAM_PROFILE_ID, "Profile-1"),
                ],
                AuthType::IamAssume,
            ),
        ];
        for (pairs, expected) in cases {
            let props = ServiceProperties::from_pairs(pairs);
            let auth = authenticator_from_properties(&props).unwrap();
            assert_eq!(auth.auth_type(), expected);
        }
    }

    #[test]
    fn numeric_properties_are_validated() {
        let props = ServiceProperties::from_pairs([
            (PROP_MAX_RETRIES, "3"),
            (PROP_RETRY_INTERVAL, "abc"),
        ]);
        assert_eq!(props.get_u32(PROP_MAX_RETRIES).unwrap(), Some(3));
        assert!(props.get_duration_secs(PROP_RETRY_INTERVAL).is_err());
        assert_eq!(props.get_u32(PROP_ENABLE_GZIP).unwrap(), None);
    }
}
