use alloc::boxed::Box;

pub(crate) trait Service<Request> {
    type Response;
    type Error;

    fn call(&mut self, request: Request) -> Result<Self::Response, Self::Error>;
}

#[inline]
#[must_use]
pub(crate) const fn service_fn<F>(f: F) -> ServiceFn<F> {
    ServiceFn { f }
}

#[derive(Clone)]
pub(crate) struct ServiceFn<F> {
    f: F,
}

impl<F, Request, Response, Error> Service<Request> for ServiceFn<F>
where
    F: FnMut(Request) -> Result<Response, Error>,
{
    type Response = Response;
    type Error = Error;

    #[inline]
    fn call(&mut self, request: Request) -> Result<Response, Error> {
        (self.f)(request)
    }
}

type DynCloneService<Request, Response, Error> = dyn CloneService<Request, Response = Response, Error = Error> + Send + Sync;

/// Type-erased service that can be cloned out of a shared registration before it's called.
pub(crate) struct BoxCloneService<Request, Response, Error>(Box<DynCloneService<Request, Response, Error>>);

impl<Request, Response, Error> BoxCloneService<Request, Response, Error> {
    #[inline]
    #[must_use]
    pub(crate) fn new<S>(service: S) -> Self
    where
        S: Service<Request, Response = Response, Error = Error> + Clone + Send + Sync + 'static,
    {
        Self(Box::new(service))
    }
}

pub(crate) trait CloneService<Request>: Service<Request> {
    fn clone_box(&self) -> Box<DynCloneService<Request, Self::Response, Self::Error>>;
}

impl<Request, T> CloneService<Request> for T
where
    T: Service<Request> + Clone + Send + Sync + 'static,
{
    #[inline]
    fn clone_box(&self) -> Box<DynCloneService<Request, T::Response, T::Error>> {
        Box::new(self.clone())
    }
}

impl<Request, Response, Error> Clone for BoxCloneService<Request, Response, Error> {
    #[inline]
    fn clone(&self) -> Self {
        Self(self.0.clone_box())
    }
}

impl<Request, Response, Error> Service<Request> for BoxCloneService<Request, Response, Error> {
    type Response = Response;
    type Error = Error;

    #[inline]
    fn call(&mut self, request: Request) -> Result<Response, Error> {
        self.0.call(request)
    }
}

#[cfg(test)]
mod tests {
    use core::convert::Infallible;

    use super::{service_fn, BoxCloneService, Service as _};

    #[test]
    fn test_boxed_clone_keeps_state_per_clone() {
        let mut calls = 0u8;
        let mut service = BoxCloneService::new(service_fn(move |step: u8| {
            calls += step;
            Ok::<_, Infallible>(calls)
        }));
        let mut cloned = service.clone();

        assert_eq!(service.call(2).unwrap(), 2);
        assert_eq!(service.call(2).unwrap(), 4);
        assert_eq!(cloned.call(1).unwrap(), 1);
    }
}
