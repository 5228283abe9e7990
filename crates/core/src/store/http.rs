//! Remote store client over HTTP.
//!
//! Talks to the Routes and Stops resources as plain JSON endpoints. Any
//! non-success status, network failure, or undecodable body becomes a
//! [`TransportError`]; the underlying cause is only logged.

use std::future::Future;
use std::pin::Pin;

use busline_transit::network::wire::{RouteDetailsRecord, RouteNameUpdate, RouteRecord, StopRecord};
use busline_transit::prelude::*;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::{ConfigError, ROUTES_URL_VAR, STOPS_URL_VAR, StoreConfig};

pub struct HttpRouteStore {
    client: Client,
    routes_url: Url,
    stops_url: Url,
}

fn parse_url(key: &'static str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|_| ConfigError::Invalid {
        key,
        value: value.to_owned(),
    })
}

impl HttpRouteStore {
    pub fn new(config: &StoreConfig) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            routes_url: parse_url(ROUTES_URL_VAR, &config.routes_url)?,
            stops_url: parse_url(STOPS_URL_VAR, &config.stops_url)?,
        })
    }

    fn route_url(&self, number: &RouteNumber) -> Url {
        let mut url = self.routes_url.clone();
        url.query_pairs_mut().append_pair("number", number.as_str());
        url
    }

    fn stop_url(&self, id: i64) -> Url {
        let mut url = self.stops_url.clone();
        url.query_pairs_mut().append_pair("id", &id.to_string());
        url
    }

    /// Send a request once, treating any non-2xx status as a failure
    async fn send(
        &self,
        operation: StoreOperation,
        request: RequestBuilder,
    ) -> Result<Response, TransportError> {
        match request.send().await.and_then(Response::error_for_status) {
            Ok(response) => {
                debug!(%operation, status = %response.status(), "remote store call succeeded");
                Ok(response)
            }
            Err(error) => {
                warn!(
                    %operation,
                    status = ?error.status(),
                    %error,
                    "remote store call failed"
                );
                Err(TransportError::new(operation))
            }
        }
    }

    async fn decode<T: DeserializeOwned>(
        operation: StoreOperation,
        response: Response,
    ) -> Result<T, TransportError> {
        response.json::<T>().await.map_err(|error| {
            warn!(%operation, %error, "remote store returned an undecodable body");
            TransportError::new(operation)
        })
    }

    fn invalid(operation: StoreOperation, error: TransitError) -> TransportError {
        warn!(%operation, %error, "remote store returned invalid data");
        TransportError::new(operation)
    }

    async fn fetch_routes(&self) -> Result<Vec<Route>, TransportError> {
        let operation = StoreOperation::ListRoutes;
        let response = self
            .send(operation, self.client.get(self.routes_url.clone()))
            .await?;
        let records: Vec<RouteRecord> = Self::decode(operation, response).await?;

        records
            .into_iter()
            .map(Route::try_from)
            .collect::<busline_transit::models::Result<Vec<_>>>()
            .map_err(|error| Self::invalid(operation, error))
    }

    async fn fetch_route_details(
        &self,
        number: &RouteNumber,
    ) -> Result<RouteDetails, TransportError> {
        let operation = StoreOperation::GetRouteDetails;
        let response = self
            .send(operation, self.client.get(self.route_url(number)))
            .await?;
        let record: RouteDetailsRecord = Self::decode(operation, response).await?;

        RouteDetails::try_from(record).map_err(|error| Self::invalid(operation, error))
    }

    async fn put_route_name(&self, number: &RouteNumber, name: &str) -> Result<(), TransportError> {
        let body = RouteNameUpdate {
            name: name.to_owned(),
        };
        self.send(
            StoreOperation::UpdateRouteName,
            self.client.put(self.route_url(number)).json(&body),
        )
        .await?;
        Ok(())
    }

    async fn post_stop(&self, stop: &NewStop) -> Result<Stop, TransportError> {
        let operation = StoreOperation::CreateStop;
        let response = self
            .send(operation, self.client.post(self.stops_url.clone()).json(stop))
            .await?;
        let record: StopRecord = Self::decode(operation, response).await?;
        Ok(Stop::from(record))
    }

    async fn put_stop(&self, id: i64, patch: &StopPatch) -> Result<(), TransportError> {
        self.send(
            StoreOperation::UpdateStop,
            self.client.put(self.stop_url(id)).json(patch),
        )
        .await?;
        Ok(())
    }
}

impl RouteStore for HttpRouteStore {
    fn list_routes<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Route>, TransportError>> + Send + 'a>> {
        Box::pin(self.fetch_routes())
    }

    fn get_route_details<'a>(
        &'a self,
        number: &'a RouteNumber,
    ) -> Pin<Box<dyn Future<Output = Result<RouteDetails, TransportError>> + Send + 'a>> {
        Box::pin(self.fetch_route_details(number))
    }

    fn update_route_name<'a>(
        &'a self,
        number: &'a RouteNumber,
        name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), TransportError>> + Send + 'a>> {
        Box::pin(self.put_route_name(number, name))
    }

    fn create_stop<'a>(
        &'a self,
        stop: &'a NewStop,
    ) -> Pin<Box<dyn Future<Output = Result<Stop, TransportError>> + Send + 'a>> {
        Box::pin(self.post_stop(stop))
    }

    fn update_stop<'a>(
        &'a self,
        id: i64,
        patch: &'a StopPatch,
    ) -> Pin<Box<dyn Future<Output = Result<(), TransportError>> + Send + 'a>> {
        Box::pin(self.put_stop(id, patch))
    }
}
