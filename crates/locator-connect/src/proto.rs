//! Wire messages and client stubs for the `hpp.broker.v1` gRPC package.
//!
//! ```text
//! service NamingContext { rpc Resolve(ResolveRequest) returns (ResolveResponse); }
//! service ObjectService { rpc Invoke(InvokeRequest) returns (InvokeResponse); }
//! ```
//!
//! Invocation payloads are JSON documents carried as bytes. An
//! `ObjectReference` with an empty `endpoint` designates an object hosted by
//! the naming service's own server.

use hpp_locator_interface as interface;

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NameComponent {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub kind: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ObjectReference {
    #[prost(string, tag = "1")]
    pub type_id: String,
    #[prost(string, tag = "2")]
    pub endpoint: String,
    #[prost(string, tag = "3")]
    pub object_key: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ResolveRequest {
    #[prost(message, repeated, tag = "1")]
    pub name: Vec<NameComponent>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ResolveResponse {
    #[prost(message, optional, tag = "1")]
    pub object: Option<ObjectReference>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct InvokeRequest {
    #[prost(string, tag = "1")]
    pub object_key: String,
    #[prost(string, tag = "2")]
    pub operation: String,
    #[prost(bytes = "vec", tag = "3")]
    pub payload: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct InvokeResponse {
    #[prost(bytes = "vec", tag = "1")]
    pub payload: Vec<u8>,
}

impl From<&interface::NameComponent> for NameComponent {
    fn from(component: &interface::NameComponent) -> Self {
        Self {
            id: component.id.clone(),
            kind: component.kind.clone(),
        }
    }
}

impl From<&interface::CompoundName> for ResolveRequest {
    fn from(name: &interface::CompoundName) -> Self {
        Self {
            name: name.components().iter().map(NameComponent::from).collect(),
        }
    }
}

impl ObjectReference {
    /// Convert into a locator reference, treating an empty endpoint as the
    /// server at `home`
    pub fn into_object_ref(self, home: &str) -> interface::ObjectRef {
        let endpoint = if self.endpoint.is_empty() {
            home.to_string()
        } else {
            self.endpoint
        };
        interface::ObjectRef::new(self.type_id, endpoint, self.object_key)
    }
}

pub mod naming_context_client {
    use super::{ResolveRequest, ResolveResponse};
    use tonic::codegen::http::uri::PathAndQuery;
    use tonic::transport::Channel;

    /// Client for `hpp.broker.v1.NamingContext`
    #[derive(Debug, Clone)]
    pub struct NamingContextClient {
        inner: tonic::client::Grpc<Channel>,
    }

    impl NamingContextClient {
        pub fn new(channel: Channel) -> Self {
            Self {
                inner: tonic::client::Grpc::new(channel),
            }
        }

        pub async fn resolve(
            &mut self,
            request: impl tonic::IntoRequest<ResolveRequest>,
        ) -> Result<tonic::Response<ResolveResponse>, tonic::Status> {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::unavailable(format!("Service was not ready: {}", e))
            })?;
            let codec = tonic_prost::ProstCodec::default();
            let path = PathAndQuery::from_static("/hpp.broker.v1.NamingContext/Resolve");
            self.inner.unary(request.into_request(), path, codec).await
        }
    }
}

pub mod object_service_client {
    use super::{InvokeRequest, InvokeResponse};
    use tonic::codegen::http::uri::PathAndQuery;
    use tonic::transport::Channel;

    /// Client for `hpp.broker.v1.ObjectService`
    #[derive(Debug, Clone)]
    pub struct ObjectServiceClient {
        inner: tonic::client::Grpc<Channel>,
    }

    impl ObjectServiceClient {
        pub fn new(channel: Channel) -> Self {
            Self {
                inner: tonic::client::Grpc::new(channel),
            }
        }

        pub async fn invoke(
            &mut self,
            request: impl tonic::IntoRequest<InvokeRequest>,
        ) -> Result<tonic::Response<InvokeResponse>, tonic::Status> {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::unavailable(format!("Service was not ready: {}", e))
            })?;
            let codec = tonic_prost::ProstCodec::default();
            let path = PathAndQuery::from_static("/hpp.broker.v1.ObjectService/Invoke");
            self.inner.unary(request.into_request(), path, codec).await
        }
    }
}

pub use naming_context_client::NamingContextClient;
pub use object_service_client::ObjectServiceClient;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_request_keeps_component_order() {
        let name: interface::CompoundName =
            "hpp-test.corbaserver/manipulation.problem".parse().unwrap();
        let request = ResolveRequest::from(&name);

        assert_eq!(request.name.len(), 2);
        assert_eq!(request.name[0].id, "hpp-test");
        assert_eq!(request.name[0].kind, "corbaserver");
        assert_eq!(request.name[1].kind, "problem");
    }

    #[test]
    fn test_empty_endpoint_defaults_to_home() {
        let reference = ObjectReference {
            type_id: "IDL:hpp/corbaserver/manipulation/Graph:1.0".to_string(),
            endpoint: String::new(),
            object_key: "graph".to_string(),
        };
        let object = reference.into_object_ref("http://planner:2809");

        assert_eq!(object.endpoint, "http://planner:2809");
        assert_eq!(object.object_key, "graph");
        assert!(object.is_typed());
    }

    #[test]
    fn test_explicit_endpoint_is_kept() {
        let reference = ObjectReference {
            type_id: String::new(),
            endpoint: "http://10.0.0.7:4000".to_string(),
            object_key: "robot".to_string(),
        };
        let object = reference.into_object_ref("http://planner:2809");

        assert_eq!(object.endpoint, "http://10.0.0.7:4000");
        assert!(!object.is_typed());
    }
}
