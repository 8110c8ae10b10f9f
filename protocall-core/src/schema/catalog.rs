//! # Service & Method Discovery
//!
//! Flat, display-friendly view of the services a [`SchemaGraph`] contains.
//! Hosts use it to populate service/method pickers before issuing a call; the
//! call client consults the same descriptors to pick the call shape.
use super::resolver::SchemaGraph;

/// A discovered service with its callable surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInfo {
    /// Short name, e.g. `Greeter`.
    pub name: String,
    /// Fully qualified name, e.g. `hello.Greeter`.
    pub full_name: String,
    pub methods: Vec<MethodInfo>,
}

/// A discovered method with resolved message types and streaming shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInfo {
    pub name: String,
    /// Fully qualified request message type.
    pub request_type: String,
    /// Fully qualified response message type.
    pub response_type: String,
    pub client_streaming: bool,
    pub server_streaming: bool,
}

/// Lists every service in the graph, in declaration order, with its methods.
///
/// Nested packages are included; the well-known files declare no services so
/// they never show up here.
pub fn services(graph: &SchemaGraph) -> Vec<ServiceInfo> {
    graph
        .pool()
        .services()
        .map(|service| ServiceInfo {
            name: service.name().to_string(),
            full_name: service.full_name().to_string(),
            methods: service
                .methods()
                .map(|method| MethodInfo {
                    name: method.name().to_string(),
                    request_type: method.input().full_name().to_string(),
                    response_type: method.output().full_name().to_string(),
                    client_streaming: method.is_client_streaming(),
                    server_streaming: method.is_server_streaming(),
                })
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::VirtualProtoFile;

    #[test]
    fn greeter_discovery_shape() {
        let graph = SchemaGraph::from_files(&[VirtualProtoFile::new(
            "hello.proto",
            r#"
            syntax = "proto3";
            package hello;
            message HelloRequest { string name = 1; }
            message HelloReply { string message = 1; }
            service Greeter {
                rpc SayHello(HelloRequest) returns (HelloReply);
            }
            "#,
        )])
        .unwrap();

        let catalog = services(&graph);
        assert_eq!(
            catalog,
            vec![ServiceInfo {
                name: "Greeter".to_string(),
                full_name: "hello.Greeter".to_string(),
                methods: vec![MethodInfo {
                    name: "SayHello".to_string(),
                    request_type: "hello.HelloRequest".to_string(),
                    response_type: "hello.HelloReply".to_string(),
                    client_streaming: false,
                    server_streaming: false,
                }],
            }]
        );
    }

    #[test]
    fn streaming_flags_follow_the_declaration() {
        let graph = SchemaGraph::from_files(&[VirtualProtoFile::new(
            "feed.proto",
            r#"
            syntax = "proto3";
            package feed;
            message Item { string id = 1; }
            service Feed {
                rpc Watch(Item) returns (stream Item);
                rpc Push(stream Item) returns (Item);
            }
            "#,
        )])
        .unwrap();

        let catalog = services(&graph);
        let methods = &catalog[0].methods;
        assert!(methods[0].server_streaming && !methods[0].client_streaming);
        assert!(methods[1].client_streaming && !methods[1].server_streaming);
    }

    #[test]
    fn services_from_every_package_are_listed() {
        let graph = SchemaGraph::from_files(&[
            VirtualProtoFile::new(
                "a.proto",
                "syntax = \"proto3\"; package a; message E {} service One { rpc Go(E) returns (E); }",
            ),
            VirtualProtoFile::new(
                "b.proto",
                "syntax = \"proto3\"; package b.nested; message E {} service Two { rpc Go(E) returns (E); }",
            ),
        ])
        .unwrap();

        let names: Vec<String> = services(&graph).into_iter().map(|s| s.full_name).collect();
        assert_eq!(names, vec!["a.One".to_string(), "b.nested.Two".to_string()]);
    }
}
