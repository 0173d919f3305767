pub mod http_authorize;
