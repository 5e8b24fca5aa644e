// @generated
/// Generated client implementations.
pub mod calculator_service_client {
    #![allow(
        unused_variables,
        dead_code,
        missing_docs,
        clippy::wildcard_imports,
        clippy::let_unit_value,
    )]
    use tonic::codegen::*;
    use tonic::codegen::http::Uri;
    /// Arithmetic over the four gRPC call shapes.
    #[derive(Debug, Clone)]
    pub struct CalculatorServiceClient<T> {
        inner: tonic::client::Grpc<T>,
    }
    impl CalculatorServiceClient<tonic::transport::Channel> {
        /// Attempt to create a new client by connecting to a given endpoint.
        pub async fn connect<D>(dst: D) -> Result<Self, tonic::transport::Error>
        where
            D: TryInto<tonic::transport::Endpoint>,
            D::Error: Into<StdError>,
        {
            let conn = tonic::transport::Endpoint::new(dst)?.connect().await?;
            Ok(Self::new(conn))
        }
    }
    impl<T> CalculatorServiceClient<T>
    where
        T: tonic::client::GrpcService<tonic::body::Body>,
        T::Error: Into<StdError>,
        T::ResponseBody: Body<Data = Bytes> + std::marker::Send + 'static,
        <T::ResponseBody as Body>::Error: Into<StdError> + std::marker::Send,
    {
        pub fn new(inner: T) -> Self {
            let inner = tonic::client::Grpc::new(inner);
            Self { inner }
        }
        pub fn with_origin(inner: T, origin: Uri) -> Self {
            let inner = tonic::client::Grpc::with_origin(inner, origin);
            Self { inner }
        }
        pub fn with_interceptor<F>(
            inner: T,
            interceptor: F,
        ) -> CalculatorServiceClient<InterceptedService<T, F>>
        where
            F: tonic::service::Interceptor,
            T::ResponseBody: Default,
            T: tonic::codegen::Service<
                http::Request<tonic::body::Body>,
                Response = http::Response<
                    <T as tonic::client::GrpcService<tonic::body::Body>>::ResponseBody,
                >,
            >,
            <T as tonic::codegen::Service<
                http::Request<tonic::body::Body>,
            >>::Error: Into<StdError> + std::marker::Send + std::marker::Sync,
        {
            CalculatorServiceClient::new(InterceptedService::new(inner, interceptor))
        }
        /// Compress requests with the given encoding.
        ///
        /// This requires the server to support it otherwise it might respond with an
        /// error.
        #[must_use]
        pub fn send_compressed(mut self, encoding: CompressionEncoding) -> Self {
            self.inner = self.inner.send_compressed(encoding);
            self
        }
        /// Enable decompressing responses.
        #[must_use]
        pub fn accept_compressed(mut self, encoding: CompressionEncoding) -> Self {
            self.inner = self.inner.accept_compressed(encoding);
            self
        }
        /// Limits the maximum size of a decoded message.
        ///
        /// Default: `4MB`
        #[must_use]
        pub fn max_decoding_message_size(mut self, limit: usize) -> Self {
            self.inner = self.inner.max_decoding_message_size(limit);
            self
        }
        /// Limits the maximum size of an encoded message.
        ///
        /// Default: `usize::MAX`
        #[must_use]
        pub fn max_encoding_message_size(mut self, limit: usize) -> Self {
            self.inner = self.inner.max_encoding_message_size(limit);
            self
        }
        /// Unary: a + b.
        pub async fn sum(
            &mut self,
            request: impl tonic::IntoRequest<super::SumRequest>,
        ) -> std::result::Result<tonic::Response<super::SumResponse>, tonic::Status> {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::unknown(
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic_prost::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/calculator.v1.CalculatorService/Sum",
            );
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(GrpcMethod::new("calculator.v1.CalculatorService", "Sum"));
            self.inner.unary(req, path, codec).await
        }
        /// Unary with simulated bounded work; honors the caller's deadline.
        pub async fn sum_with_deadline(
            &mut self,
            request: impl tonic::IntoRequest<super::SumRequest>,
        ) -> std::result::Result<tonic::Response<super::SumResponse>, tonic::Status> {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::unknown(
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic_prost::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/calculator.v1.CalculatorService/SumWithDeadline",
            );
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(
                    GrpcMethod::new(
                        "calculator.v1.CalculatorService",
                        "SumWithDeadline",
                    ),
                );
            self.inner.unary(req, path, codec).await
        }
        /// Unary: square root of a non-negative number.
        pub async fn square(
            &mut self,
            request: impl tonic::IntoRequest<super::SquareRequest>,
        ) -> std::result::Result<tonic::Response<super::SquareResponse>, tonic::Status> {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::unknown(
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic_prost::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/calculator.v1.CalculatorService/Square",
            );
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(GrpcMethod::new("calculator.v1.CalculatorService", "Square"));
            self.inner.unary(req, path, codec).await
        }
        /// Server streaming: one message per prime factor, smallest first.
        pub async fn factorize(
            &mut self,
            request: impl tonic::IntoRequest<super::FactorizeRequest>,
        ) -> std::result::Result<
            tonic::Response<tonic::codec::Streaming<super::FactorResponse>>,
            tonic::Status,
        > {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::unknown(
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic_prost::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/calculator.v1.CalculatorService/Factorize",
            );
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(GrpcMethod::new("calculator.v1.CalculatorService", "Factorize"));
            self.inner.server_streaming(req, path, codec).await
        }
        /// Client streaming: mean of all values sent before the stream closed.
        pub async fn average(
            &mut self,
            request: impl tonic::IntoStreamingRequest<Message = super::AverageRequest>,
        ) -> std::result::Result<
            tonic::Response<super::AverageResponse>,
            tonic::Status,
        > {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::unknown(
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic_prost::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/calculator.v1.CalculatorService/Average",
            );
            let mut req = request.into_streaming_request();
            req.extensions_mut()
                .insert(GrpcMethod::new("calculator.v1.CalculatorService", "Average"));
            self.inner.client_streaming(req, path, codec).await
        }
        /// Bidirectional: one response per request.
        pub async fn find_max(
            &mut self,
            request: impl tonic::IntoStreamingRequest<Message = super::MaxRequest>,
        ) -> std::result::Result<
            tonic::Response<tonic::codec::Streaming<super::MaxResponse>>,
            tonic::Status,
        > {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::unknown(
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic_prost::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/calculator.v1.CalculatorService/FindMax",
            );
            let mut req = request.into_streaming_request();
            req.extensions_mut()
                .insert(GrpcMethod::new("calculator.v1.CalculatorService", "FindMax"));
            self.inner.streaming(req, path, codec).await
        }
    }
}
/// Generated server implementations.
pub mod calculator_service_server {
    #![allow(
        unused_variables,
        dead_code,
        missing_docs,
        clippy::wildcard_imports,
        clippy::let_unit_value,
    )]
    use tonic::codegen::*;
    /// Generated trait containing gRPC methods that should be implemented for use with CalculatorServiceServer.
    #[async_trait]
    pub trait CalculatorService: std::marker::Send + std::marker::Sync + 'static {
        /// Unary: a + b.
        async fn sum(
            &self,
            request: tonic::Request<super::SumRequest>,
        ) -> std::result::Result<tonic::Response<super::SumResponse>, tonic::Status>;
        /// Unary with simulated bounded work; honors the caller's deadline.
        async fn sum_with_deadline(
            &self,
            request: tonic::Request<super::SumRequest>,
        ) -> std::result::Result<tonic::Response<super::SumResponse>, tonic::Status>;
        /// Unary: square root of a non-negative number.
        async fn square(
            &self,
            request: tonic::Request<super::SquareRequest>,
        ) -> std::result::Result<tonic::Response<super::SquareResponse>, tonic::Status>;
        /// Server streaming response type for the Factorize method.
        type FactorizeStream: tonic::codegen::tokio_stream::Stream<
                Item = std::result::Result<super::FactorResponse, tonic::Status>,
            >
            + std::marker::Send
            + 'static;
        /// Server streaming: one message per prime factor, smallest first.
        async fn factorize(
            &self,
            request: tonic::Request<super::FactorizeRequest>,
        ) -> std::result::Result<tonic::Response<Self::FactorizeStream>, tonic::Status>;
        /// Client streaming: mean of all values sent before the stream closed.
        async fn average(
            &self,
            request: tonic::Request<tonic::Streaming<super::AverageRequest>>,
        ) -> std::result::Result<tonic::Response<super::AverageResponse>, tonic::Status>;
        /// Server streaming response type for the FindMax method.
        type FindMaxStream: tonic::codegen::tokio_stream::Stream<
                Item = std::result::Result<super::MaxResponse, tonic::Status>,
            >
            + std::marker::Send
            + 'static;
        /// Bidirectional: one response per request.
        async fn find_max(
            &self,
            request: tonic::Request<tonic::Streaming<super::MaxRequest>>,
        ) -> std::result::Result<tonic::Response<Self::FindMaxStream>, tonic::Status>;
    }
    /// Arithmetic over the four gRPC call shapes.
    #[derive(Debug)]
    pub struct CalculatorServiceServer<T> {
        inner: Arc<T>,
        accept_compression_encodings: EnabledCompressionEncodings,
        send_compression_encodings: EnabledCompressionEncodings,
        max_decoding_message_size: Option<usize>,
        max_encoding_message_size: Option<usize>,
    }
    impl<T> CalculatorServiceServer<T> {
        pub fn new(inner: T) -> Self {
            Self::from_arc(Arc::new(inner))
        }
        pub fn from_arc(inner: Arc<T>) -> Self {
            Self {
                inner,
                accept_compression_encodings: Default::default(),
                send_compression_encodings: Default::default(),
                max_decoding_message_size: None,
                max_encoding_message_size: None,
            }
        }
        pub fn with_interceptor<F>(
            inner: T,
            interceptor: F,
        ) -> InterceptedService<Self, F>
        where
            F: tonic::service::Interceptor,
        {
            InterceptedService::new(Self::new(inner), interceptor)
        }
        /// Enable decompressing requests with the given encoding.
        #[must_use]
        pub fn accept_compressed(mut self, encoding: CompressionEncoding) -> Self {
            self.accept_compression_encodings.enable(encoding);
            self
        }
        /// Compress responses with the given encoding, if the client supports it.
        #[must_use]
        pub fn send_compressed(mut self, encoding: CompressionEncoding) -> Self {
            self.send_compression_encodings.enable(encoding);
            self
        }
        /// Limits the maximum size of a decoded message.
        ///
        /// Default: `4MB`
        #[must_use]
        pub fn max_decoding_message_size(mut self, limit: usize) -> Self {
            self.max_decoding_message_size = Some(limit);
            self
        }
        /// Limits the maximum size of an encoded message.
        ///
        /// Default: `usize::MAX`
        #[must_use]
        pub fn max_encoding_message_size(mut self, limit: usize) -> Self {
            self.max_encoding_message_size = Some(limit);
            self
        }
    }
    impl<T, B> tonic::codegen::Service<http::Request<B>> for CalculatorServiceServer<T>
    where
        T: CalculatorService,
        B: Body + std::marker::Send + 'static,
        B::Error: Into<StdError> + std::marker::Send + 'static,
    {
        type Response = http::Response<tonic::body::Body>;
        type Error = std::convert::Infallible;
        type Future = BoxFuture<Self::Response, Self::Error>;
        fn poll_ready(
            &mut self,
            _cx: &mut Context<'_>,
        ) -> Poll<std::result::Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }
        fn call(&mut self, req: http::Request<B>) -> Self::Future {
            match req.uri().path() {
                "/calculator.v1.CalculatorService/Sum" => {
                    #[allow(non_camel_case_types)]
                    struct SumSvc<T: CalculatorService>(pub Arc<T>);
                    impl<
                        T: CalculatorService,
                    > tonic::server::UnaryService<super::SumRequest> for SumSvc<T> {
                        type Response = super::SumResponse;
                        type Future = BoxFuture<
                            tonic::Response<Self::Response>,
                            tonic::Status,
                        >;
                        fn call(
                            &mut self,
                            request: tonic::Request<super::SumRequest>,
                        ) -> Self::Future {
                            let inner = Arc::clone(&self.0);
                            let fut = async move {
                                <T as CalculatorService>::sum(&inner, request).await
                            };
                            Box::pin(fut)
                        }
                    }
                    let accept_compression_encodings = self.accept_compression_encodings;
                    let send_compression_encodings = self.send_compression_encodings;
                    let max_decoding_message_size = self.max_decoding_message_size;
                    let max_encoding_message_size = self.max_encoding_message_size;
                    let inner = self.inner.clone();
                    let fut = async move {
                        let method = SumSvc(inner);
                        let codec = tonic_prost::ProstCodec::default();
                        let mut grpc = tonic::server::Grpc::new(codec)
                            .apply_compression_config(
                                accept_compression_encodings,
                                send_compression_encodings,
                            )
                            .apply_max_message_size_config(
                                max_decoding_message_size,
                                max_encoding_message_size,
                            );
                        let res = grpc.unary(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                "/calculator.v1.CalculatorService/SumWithDeadline" => {
                    #[allow(non_camel_case_types)]
                    struct SumWithDeadlineSvc<T: CalculatorService>(pub Arc<T>);
                    impl<
                        T: CalculatorService,
                    > tonic::server::UnaryService<super::SumRequest>
                    for SumWithDeadlineSvc<T> {
                        type Response = super::SumResponse;
                        type Future = BoxFuture<
                            tonic::Response<Self::Response>,
                            tonic::Status,
                        >;
                        fn call(
                            &mut self,
                            request: tonic::Request<super::SumRequest>,
                        ) -> Self::Future {
                            let inner = Arc::clone(&self.0);
                            let fut = async move {
                                <T as CalculatorService>::sum_with_deadline(&inner, request)
                                    .await
                            };
                            Box::pin(fut)
                        }
                    }
                    let accept_compression_encodings = self.accept_compression_encodings;
                    let send_compression_encodings = self.send_compression_encodings;
                    let max_decoding_message_size = self.max_decoding_message_size;
                    let max_encoding_message_size = self.max_encoding_message_size;
                    let inner = self.inner.clone();
                    let fut = async move {
                        let method = SumWithDeadlineSvc(inner);
                        let codec = tonic_prost::ProstCodec::default();
                        let mut grpc = tonic::server::Grpc::new(codec)
                            .apply_compression_config(
                                accept_compression_encodings,
                                send_compression_encodings,
                            )
                            .apply_max_message_size_config(
                                max_decoding_message_size,
                                max_encoding_message_size,
                            );
                        let res = grpc.unary(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                "/calculator.v1.CalculatorService/Square" => {
                    #[allow(non_camel_case_types)]
                    struct SquareSvc<T: CalculatorService>(pub Arc<T>);
                    impl<
                        T: CalculatorService,
                    > tonic::server::UnaryService<super::SquareRequest>
                    for SquareSvc<T> {
                        type Response = super::SquareResponse;
                        type Future = BoxFuture<
                            tonic::Response<Self::Response>,
                            tonic::Status,
                        >;
                        fn call(
                            &mut self,
                            request: tonic::Request<super::SquareRequest>,
                        ) -> Self::Future {
                            let inner = Arc::clone(&self.0);
                            let fut = async move {
                                <T as CalculatorService>::square(&inner, request).await
                            };
                            Box::pin(fut)
                        }
                    }
                    let accept_compression_encodings = self.accept_compression_encodings;
                    let send_compression_encodings = self.send_compression_encodings;
                    let max_decoding_message_size = self.max_decoding_message_size;
                    let max_encoding_message_size = self.max_encoding_message_size;
                    let inner = self.inner.clone();
                    let fut = async move {
                        let method = SquareSvc(inner);
                        let codec = tonic_prost::ProstCodec::default();
                        let mut grpc = tonic::server::Grpc::new(codec)
                            .apply_compression_config(
                                accept_compression_encodings,
                                send_compression_encodings,
                            )
                            .apply_max_message_size_config(
                                max_decoding_message_size,
                                max_encoding_message_size,
                            );
                        let res = grpc.unary(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                "/calculator.v1.CalculatorService/Factorize" => {
                    #[allow(non_camel_case_types)]
                    struct FactorizeSvc<T: CalculatorService>(pub Arc<T>);
                    impl<
                        T: CalculatorService,
                    > tonic::server::ServerStreamingService<super::FactorizeRequest>
                    for FactorizeSvc<T> {
                        type Response = super::FactorResponse;
                        type ResponseStream = T::FactorizeStream;
                        type Future = BoxFuture<
                            tonic::Response<Self::ResponseStream>,
                            tonic::Status,
                        >;
                        fn call(
                            &mut self,
                            request: tonic::Request<super::FactorizeRequest>,
                        ) -> Self::Future {
                            let inner = Arc::clone(&self.0);
                            let fut = async move {
                                <T as CalculatorService>::factorize(&inner, request).await
                            };
                            Box::pin(fut)
                        }
                    }
                    let accept_compression_encodings = self.accept_compression_encodings;
                    let send_compression_encodings = self.send_compression_encodings;
                    let max_decoding_message_size = self.max_decoding_message_size;
                    let max_encoding_message_size = self.max_encoding_message_size;
                    let inner = self.inner.clone();
                    let fut = async move {
                        let method = FactorizeSvc(inner);
                        let codec = tonic_prost::ProstCodec::default();
                        let mut grpc = tonic::server::Grpc::new(codec)
                            .apply_compression_config(
                                accept_compression_encodings,
                                send_compression_encodings,
                            )
                            .apply_max_message_size_config(
                                max_decoding_message_size,
                                max_encoding_message_size,
                            );
                        let res = grpc.server_streaming(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                "/calculator.v1.CalculatorService/Average" => {
                    #[allow(non_camel_case_types)]
                    struct AverageSvc<T: CalculatorService>(pub Arc<T>);
                    impl<
                        T: CalculatorService,
                    > tonic::server::ClientStreamingService<super::AverageRequest>
                    for AverageSvc<T> {
                        type Response = super::AverageResponse;
                        type Future = BoxFuture<
                            tonic::Response<Self::Response>,
                            tonic::Status,
                        >;
                        fn call(
                            &mut self,
                            request: tonic::Request<
                                tonic::Streaming<super::AverageRequest>,
                            >,
                        ) -> Self::Future {
                            let inner = Arc::clone(&self.0);
                            let fut = async move {
                                <T as CalculatorService>::average(&inner, request).await
                            };
                            Box::pin(fut)
                        }
                    }
                    let accept_compression_encodings = self.accept_compression_encodings;
                    let send_compression_encodings = self.send_compression_encodings;
                    let max_decoding_message_size = self.max_decoding_message_size;
                    let max_encoding_message_size = self.max_encoding_message_size;
                    let inner = self.inner.clone();
                    let fut = async move {
                        let method = AverageSvc(inner);
                        let codec = tonic_prost::ProstCodec::default();
                        let mut grpc = tonic::server::Grpc::new(codec)
                            .apply_compression_config(
                                accept_compression_encodings,
                                send_compression_encodings,
                            )
                            .apply_max_message_size_config(
                                max_decoding_message_size,
                                max_encoding_message_size,
                            );
                        let res = grpc.client_streaming(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                "/calculator.v1.CalculatorService/FindMax" => {
                    #[allow(non_camel_case_types)]
                    struct FindMaxSvc<T: CalculatorService>(pub Arc<T>);
                    impl<
                        T: CalculatorService,
                    > tonic::server::StreamingService<super::MaxRequest>
                    for FindMaxSvc<T> {
                        type Response = super::MaxResponse;
                        type ResponseStream = T::FindMaxStream;
                        type Future = BoxFuture<
                            tonic::Response<Self::ResponseStream>,
                            tonic::Status,
                        >;
                        fn call(
                            &mut self,
                            request: tonic::Request<tonic::Streaming<super::MaxRequest>>,
                        ) -> Self::Future {
                            let inner = Arc::clone(&self.0);
                            let fut = async move {
                                <T as CalculatorService>::find_max(&inner, request).await
                            };
                            Box::pin(fut)
                        }
                    }
                    let accept_compression_encodings = self.accept_compression_encodings;
                    let send_compression_encodings = self.send_compression_encodings;
                    let max_decoding_message_size = self.max_decoding_message_size;
                    let max_encoding_message_size = self.max_encoding_message_size;
                    let inner = self.inner.clone();
                    let fut = async move {
                        let method = FindMaxSvc(inner);
                        let codec = tonic_prost::ProstCodec::default();
                        let mut grpc = tonic::server::Grpc::new(codec)
                            .apply_compression_config(
                                accept_compression_encodings,
                                send_compression_encodings,
                            )
                            .apply_max_message_size_config(
                                max_decoding_message_size,
                                max_encoding_message_size,
                            );
                        let res = grpc.streaming(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                _ => {
                    Box::pin(async move {
                        let mut response = http::Response::new(
                            tonic::body::Body::default(),
                        );
                        let headers = response.headers_mut();
                        headers
                            .insert(
                                tonic::Status::GRPC_STATUS,
                                (tonic::Code::Unimplemented as i32).into(),
                            );
                        headers
                            .insert(
                                http::header::CONTENT_TYPE,
                                tonic::metadata::GRPC_CONTENT_TYPE,
                            );
                        Ok(response)
                    })
                }
            }
        }
    }
    impl<T> Clone for CalculatorServiceServer<T> {
        fn clone(&self) -> Self {
            let inner = self.inner.clone();
            Self {
                inner,
                accept_compression_encodings: self.accept_compression_encodings,
                send_compression_encodings: self.send_compression_encodings,
                max_decoding_message_size: self.max_decoding_message_size,
                max_encoding_message_size: self.max_encoding_message_size,
            }
        }
    }
    /// Generated gRPC service name
    pub const SERVICE_NAME: &str = "calculator.v1.CalculatorService";
    impl<T> tonic::server::NamedService for CalculatorServiceServer<T> {
        const NAME: &'static str = SERVICE_NAME;
    }
}
