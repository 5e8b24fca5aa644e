// @generated
// This file is @generated by prost-build.
#[derive(Clone, Copy, PartialEq, Eq, Hash, ::prost::Message)]
pub struct SumRequest {
    #[prost(int32, tag = "1")]
    pub a: i32,
    #[prost(int32, tag = "2")]
    pub b: i32,
}
#[derive(Clone, Copy, PartialEq, Eq, Hash, ::prost::Message)]
pub struct SumResponse {
    #[prost(int32, tag = "1")]
    pub result: i32,
}
#[derive(Clone, Copy, PartialEq, Eq, Hash, ::prost::Message)]
pub struct SquareRequest {
    #[prost(int32, tag = "1")]
    pub num: i32,
}
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct SquareResponse {
    #[prost(double, tag = "1")]
    pub result: f64,
}
#[derive(Clone, Copy, PartialEq, Eq, Hash, ::prost::Message)]
pub struct FactorizeRequest {
    #[prost(int32, tag = "1")]
    pub number: i32,
}
#[derive(Clone, Copy, PartialEq, Eq, Hash, ::prost::Message)]
pub struct FactorResponse {
    #[prost(int32, tag = "1")]
    pub factor: i32,
}
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct AverageRequest {
    #[prost(float, tag = "1")]
    pub value: f32,
}
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct AverageResponse {
    #[prost(float, tag = "1")]
    pub result: f32,
}
#[derive(Clone, Copy, PartialEq, Eq, Hash, ::prost::Message)]
pub struct MaxRequest {
    #[prost(int32, tag = "1")]
    pub value: i32,
}
#[derive(Clone, Copy, PartialEq, Eq, Hash, ::prost::Message)]
pub struct MaxResponse {
    #[prost(int32, tag = "1")]
    pub result: i32,
}
// @@protoc_insertion_point(module)
