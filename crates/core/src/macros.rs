/// Declare a string-valued enum that tolerates values added by the server.
///
/// Known values map to unit variants; anything else is kept verbatim in
/// `Other(String)` so responses keep decoding when the server grows a new
/// value. Serializes back to the exact wire string.
///
/// ```
/// scc_core::string_enum! {
///     /// Scan type.
///     pub enum ScanType {
///         OnDemand = "ondemand",
///         Scheduled = "scheduled",
///     }
/// }
///
/// assert_eq!(ScanType::from("ondemand"), ScanType::OnDemand);
/// assert_eq!(ScanType::from("weekly"), ScanType::Other("weekly".into()));
/// assert_eq!(ScanType::Scheduled.as_str(), "scheduled");
/// ```
#[macro_export]
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $value:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, ::serde::Serialize, ::serde::Deserialize)]
        #[serde(from = "String", into = "String")]
        $vis enum $name {
            $( $(#[$vmeta])* $variant, )+
            /// A value not known to this client.
            Other(String),
        }

        impl $name {
            /// The wire value.
            pub fn as_str(&self) -> &str {
                match self {
                    $( Self::$variant => $value, )+
                    Self::Other(value) => value.as_str(),
                }
            }
        }

        impl ::std::convert::From<String> for $name {
            fn from(value: String) -> Self {
                match value.as_str() {
                    $( $value => Self::$variant, )+
                    _ => Self::Other(value),
                }
            }
        }

        impl ::std::convert::From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::from(value.to_owned())
            }
        }

        impl ::std::convert::From<$name> for String {
            fn from(value: $name) -> String {
                match value {
                    $name::Other(value) => value,
                    known => known.as_str().to_owned(),
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

#[cfg(test)]
mod tests {
    string_enum! {
        /// Test status.
        pub enum Status {
            Pass = "pass",
            Failure = "failure",
        }
    }

    #[test]
    fn round_trips_known_and_unknown_values() {
        let decoded: Vec<Status> = serde_json::from_str(r#"["pass","failure","maybe"]"#).unwrap();
        assert_eq!(
            decoded,
            vec![Status::Pass, Status::Failure, Status::Other("maybe".into())]
        );
        assert_eq!(
            serde_json::to_string(&decoded).unwrap(),
            r#"["pass","failure","maybe"]"#
        );
        assert_eq!(Status::Failure.to_string(), "failure");
    }
}
