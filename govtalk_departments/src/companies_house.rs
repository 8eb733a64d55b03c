//! Companies House XML gateway searches.

use std::sync::Arc;

use govtalk_client::{Client, GatewayConfig, HttpTransport, Transport};
use govtalk_core::{
    auth::ChMd5Hook,
    message::{AuthType, Body},
    response::{child_elements, child_text},
    validate,
    writer::XmlWriter,
};
use serde::Serialize;
use xmltree::Element;

use crate::{DepartmentError, reject_errors};

pub const GATEWAY_URL: &str = "http://xmlgw.companieshouse.gov.uk/v1-0/xmlgw/Gateway";
pub const SCHEMA_LOCATION: &str = "http://xmlgw.companieshouse.gov.uk/v1-0/schema/Egov_ch-v2-0.xsd";
pub const DEFAULT_DATASET: &str = "LIVE";

const EXACT_MATCH: &str = "EXACT";

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct CompanySummary {
    pub name: String,
    pub number: String,
}

#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct CompanySearch {
    /// The entry Companies House flagged as an exact match, if any.
    pub exact: Option<CompanySummary>,
    pub matches: Vec<CompanySummary>,
}

pub struct CompaniesHouse<T> {
    client: Client<T>,
}

impl CompaniesHouse<HttpTransport> {
    pub fn new(sender_id: &str, password: &str) -> Result<Self, DepartmentError> {
        let config = Self::config(sender_id, password)?;
        let client = Client::new(config)?;
        Ok(Self::from_client(client))
    }
}

impl<T> CompaniesHouse<T>
where
    T: Transport,
{
    pub fn with_transport(sender_id: &str, password: &str, transport: T) -> Result<Self, DepartmentError> {
        let config = Self::config(sender_id, password)?;
        Ok(Self::from_client(Client::with_transport(config, transport)))
    }

    fn config(sender_id: &str, password: &str) -> Result<GatewayConfig, DepartmentError> {
        Ok(GatewayConfig::new(GATEWAY_URL, sender_id, password)?
            .with_auth_type(AuthType::Alternative)
            .with_schema_location(SCHEMA_LOCATION)?)
    }

    fn from_client(client: Client<T>) -> Self {
        Self {
            client: client.with_auth_hook(Arc::new(ChMd5Hook)),
        }
    }

    pub fn client(&self) -> &Client<T> {
        &self.client
    }

    /// Companies with a registered name matching or close to `name`.
    /// `dataset` defaults to `LIVE`.
    pub async fn name_search(
        &mut self,
        name: &str,
        dataset: Option<&str>,
    ) -> Result<CompanySearch, DepartmentError> {
        let name = validate::company_name(name)?;
        let dataset = validate::dataset(dataset.unwrap_or(DEFAULT_DATASET))?;

        let mut body = XmlWriter::new();
        body.start_element("NameSearchRequest");
        body.write_element("CompanyName", name);
        body.write_element("DataSet", dataset);
        body.end_element();

        self.search("NameSearch", body).await
    }

    /// Companies whose number starts with `number` (trailing `*` allowed).
    pub async fn number_search(
        &mut self,
        number: &str,
        dataset: Option<&str>,
    ) -> Result<CompanySearch, DepartmentError> {
        let number = validate::company_number(number)?;
        let dataset = validate::dataset(dataset.unwrap_or(DEFAULT_DATASET))?;

        let mut body = XmlWriter::new();
        body.start_element("NumberSearchRequest");
        body.write_element("PartialCompanyNumber", number);
        body.write_element("DataSet", dataset);
        body.end_element();

        self.search("NumberSearch", body).await
    }

    async fn search(&mut self, class: &str, body: XmlWriter) -> Result<CompanySearch, DepartmentError> {
        let mut envelope = self.client.envelope()?;
        envelope.set_class(class)?;
        envelope.set_qualifier("request")?;
        envelope.set_body(Body::try_from(body)?);

        let response = self.client.send(envelope).await?;
        reject_errors(response)?;

        let result = response
            .body()
            .and_then(|body| body.get_child(class))
            .ok_or_else(|| DepartmentError::UnexpectedResponse(format!("no {class} in body")))?;

        let search = parse_search_result(result);
        tracing::debug!(class, matches = search.matches.len(), "company search");
        Ok(search)
    }
}

pub(crate) fn parse_search_result(result: &Element) -> CompanySearch {
    let mut search = CompanySearch::default();

    for item in child_elements(result, "CoSearchItem") {
        let company = CompanySummary {
            name: child_text(item, "CompanyName").unwrap_or_default(),
            number: child_text(item, "CompanyNumber").unwrap_or_default(),
        };
        if child_text(item, "SearchMatch").as_deref() == Some(EXACT_MATCH) {
            search.exact = Some(company.clone());
        }
        search.matches.push(company);
    }

    search
}
