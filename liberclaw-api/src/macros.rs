/// Builder-style setter for an optional request field.
macro_rules! setter {
    (opt $field:ident : $ty:ty) => {
        pub fn $field<T>(mut self, $field: T) -> Self
        where
            T: Into<$ty>,
        {
            self.$field = std::option::Option::Some($field.into());
            self
        }
    };
}

/// Response types whose successful body is JSON.
macro_rules! json_response {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::request::FromResponse for $ty {
                fn from_response(
                    status: ::reqwest::StatusCode,
                    _headers: &::reqwest::header::HeaderMap,
                    body: &[u8],
                ) -> Result<Self, $crate::error::ApiError> {
                    $crate::transport::decode_body(status, body)
                }
            }
        )+
    };
}

pub(crate) use json_response;
pub(crate) use setter;
